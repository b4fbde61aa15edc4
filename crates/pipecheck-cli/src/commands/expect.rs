use crate::cli::{OrganismArg, TargetArg};
use crate::config::Settings;
use crate::support::{join_or_dash, policy_or_exit, print_json};
use pipecheck_kernel::{ExperimentFacts, Organism, PreferredDefaultRule, TargetClass};
use serde_json::json;

pub struct Args {
    pub assay: String,
    pub replicates: u16,
    pub target: TargetArg,
    pub control: bool,
    pub redacted: bool,
    pub organism: Option<OrganismArg>,
    pub stranded: bool,
    pub json: bool,
}

pub fn run(args: Args, settings: &Settings) {
    let policy = policy_or_exit(&args.assay, settings);
    let facts = synthetic_facts(&args);
    let expectation = policy.expected_outputs(&facts);
    let table = policy.table();
    let assemblies = table.allowed_assemblies(&facts);
    let annotations = table.allowed_annotations(&facts);

    if args.json {
        print_json(&json!({
            "assay": policy.assay(),
            "facts": facts,
            "expectation": expectation,
            "allowed_assemblies": assemblies,
            "allowed_genome_annotations": annotations,
            "ranking_policy": policy.ranking().name(),
        }));
        return;
    }

    println!(
        "pipecheck expect {} --replicates {}",
        policy.assay(),
        facts.rep_count
    );
    println!(
        "  Classification: {}{}{}",
        facts.target_class,
        if facts.control { ", control" } else { "" },
        if facts.redacted { ", redacted" } else { "" }
    );
    println!("  Replicate pairs: {}", facts.rep_pair_count);
    println!("  Ranking policy: {}", policy.ranking().name());
    println!("  Assemblies: {}", join_or_dash(&assemblies));
    println!("  Genome annotations: {}", join_or_dash(&annotations));
    println!("  Expected outputs:");
    for (key, count) in &expectation.outputs {
        println!("    {key}: {count}");
    }
    match &expectation.preferred {
        PreferredDefaultRule::Forbidden => println!("  Preferred defaults: forbidden"),
        PreferredDefaultRule::Unchecked => println!("  Preferred defaults: not checked"),
        PreferredDefaultRule::Required(rule) => {
            let formats: Vec<String> = rule
                .format_options
                .iter()
                .map(|option| format!("[{}]", option.join(", ")))
                .collect();
            let types: Vec<&str> = rule.output_types.iter().map(String::as_str).collect();
            println!("  Preferred defaults:");
            println!("    formats: {}", formats.join(" or "));
            println!("    {} of: {}", rule.cardinality, types.join(", "));
            if rule.relax_when_unreplicated {
                println!("    (none required when unreplicated)");
            }
        }
    }
}

fn synthetic_facts(args: &Args) -> ExperimentFacts {
    let target_class = match args.target {
        TargetArg::Tf => TargetClass::TranscriptionFactor,
        TargetArg::Histone => TargetClass::Histone,
        TargetArg::None => TargetClass::NoTarget,
    };
    let mut facts = ExperimentFacts::synthetic(args.replicates, target_class);
    if args.control {
        facts.control = true;
        facts.control_type = Some("control".to_string());
    }
    facts.redacted = args.redacted;
    facts.organism = args.organism.map(|organism| match organism {
        OrganismArg::Human => Organism::Human,
        OrganismArg::Mouse => Organism::Mouse,
    });
    if args.stranded {
        facts.strand_specificities.insert("stranded".to_string());
    }
    facts
}

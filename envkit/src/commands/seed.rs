//! `envkit seed`: seed every available generator and report the state.

use anyhow::Result;
use serde_json::json;

use envkit_seed::{Library, SeedManager, SeedRegistry};

const SAMPLE_LEN: usize = 4;

pub fn cmd_seed(seed: Option<u64>, libraries: &[Library], json: bool) -> Result<()> {
    let mut manager = SeedManager::new(seed);
    let filter = (!libraries.is_empty()).then_some(libraries);
    let seeded = manager.seed_everything(filter);

    // First draws of the seeded python generator, to compare runs.
    let sample = seeded
        .contains_key(&Library::Python)
        .then(|| SeedRegistry::builtin_targets().python.sample(SAMPLE_LEN));

    if json {
        let body = json!({
            "state": manager.get_state(),
            "seeded": seeded,
            "key": manager.prng_key(),
            "sample": sample,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        println!("{manager}");
        let names: Vec<&str> = seeded.keys().map(|l| l.as_str()).collect();
        let noun = if names.len() == 1 { "library" } else { "libraries" };
        eprintln!("Seeded {} {}: {}", names.len(), noun, names.join(", "));
    }
    Ok(())
}

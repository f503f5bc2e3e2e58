use std::path::PathBuf;

use acetune_params::{ParamCodec, ParamKind};
use anyhow::{Context as _, ensure};
use serde::Serialize;

use super::ParamArgs;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct InspectArg {
    #[clap(flatten)]
    params: ParamArgs,
    /// Print the layout as JSON
    #[arg(long)]
    json: bool,
    /// Write the re-emitted base parameters to this file
    #[arg(long)]
    emit: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
struct LayoutEntry {
    name: String,
    kind: String,
    len: usize,
    slots: usize,
    offset: usize,
}

fn layout(codec: &ParamCodec) -> Vec<LayoutEntry> {
    let mut offset = 0;
    codec
        .schema()
        .descriptors()
        .iter()
        .map(|desc| {
            let entry = LayoutEntry {
                name: desc.name.clone(),
                kind: desc.kind.to_string(),
                len: desc.len,
                slots: desc.slots(),
                offset,
            };
            offset += desc.slots();
            entry
        })
        .collect()
}

/// Flattens the base parameters, emits them, and flattens the emitted set again.
fn check_round_trip(codec: &ParamCodec) -> anyhow::Result<()> {
    let flat = codec.initial_vector()?;
    let emitted = codec.unflatten_and_emit(&flat)?;
    let again = codec.flatten(&codec.select(&emitted)?)?;
    ensure!(flat == again, "codec round trip changed the flat vector");
    Ok(())
}

pub(crate) fn run(arg: &InspectArg) -> anyhow::Result<()> {
    let codec = arg.params.load_codec()?;
    let entries = layout(&codec);

    if arg.json {
        let json = serde_json::to_string_pretty(&entries).context("Failed to serialize layout")?;
        println!("{json}");
    } else {
        println!("{:<32} {:<15} {:>5} {:>5} {:>6}", "name", "kind", "len", "slots", "offset");
        for e in &entries {
            println!(
                "{:<32} {:<15} {:>5} {:>5} {:>6}",
                e.name, e.kind, e.len, e.slots, e.offset
            );
        }
        let symmetric = codec
            .schema()
            .descriptors()
            .iter()
            .filter(|d| d.kind == ParamKind::SymmetricTable)
            .count();
        println!(
            "{} parameters ({symmetric} symmetric), {} slots",
            entries.len(),
            codec.schema().total_slots()
        );
    }

    check_round_trip(&codec)?;
    eprintln!("Codec round trip OK");

    if let Some(path) = &arg.emit {
        let emitted = codec.unflatten_and_emit(&codec.initial_vector()?)?;
        emitted
            .save(path)
            .with_context(|| format!("Failed to write parameters: {}", path.display()))?;
        eprintln!("Parameters written to {}", path.display());
    }
    Ok(())
}

use anyhow::Result;
use evidence::models::{ModelKind, ModelRegistry};

pub fn execute() -> Result<()> {
    let registry = ModelRegistry::load()?;

    for (name, model) in registry.list_models() {
        let kind = match model.kind {
            ModelKind::Embedding => "embedding",
            ModelKind::CrossEncoder => "cross-encoder",
        };
        let default = if *name == registry.default_embedding || *name == registry.default_reranker {
            " (default)"
        } else {
            ""
        };
        let dims = model
            .dimensions
            .map(|d| format!(", {} dims", d))
            .unwrap_or_default();

        println!("{}{}", name, default);
        println!("  {}{} - {}", kind, dims, model.description);
        println!("  {}", model.source);
    }

    Ok(())
}

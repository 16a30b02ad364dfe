use anyhow::Result;

use kb_cli::bootstrap;
use kb_rag::OllamaClient;

fn main() -> Result<()> {
    let settings = bootstrap()?;
    let client = OllamaClient::from_settings(&settings.llm)?;
    println!("Checking Ollama at {} ...", client.base_url());

    let models = client.list_models()?;
    println!("Available models:");
    for name in &models {
        let marker = if name == client.model() { " (configured)" } else { "" };
        println!("  - {name}{marker}");
    }
    if !models.iter().any(|m| m == client.model()) {
        println!("⚠️  Configured model '{}' is not pulled; run: ollama pull {}", client.model(), client.model());
    }
    Ok(())
}

//! Query command implementation

use crate::config::ResponseFormat;
use crate::error::Result;
use crate::kb::{KnowledgeBase, QueryResponse};
use tracing::info;

/// Ask a single question from the command line
pub async fn cmd_query(kb: &dyn KnowledgeBase, question: &str) -> Result<QueryResponse> {
    info!("Querying {}", kb.describe());
    kb.ask(question).await
}

/// Print a query answer to the console
pub fn print_query_result(response: &QueryResponse, format: ResponseFormat) {
    println!("{}", response.render(format));

    if format == ResponseFormat::Answer && response.answer().is_some() {
        if let Some(sources) = response.sources().filter(|s| !s.is_empty()) {
            println!("\nSources:");
            for source in sources {
                match source.as_str() {
                    Some(s) => println!("  - {}", s),
                    None => println!("  - {}", source),
                }
            }
        }
    }
}

//! services/api/src/bin/openapi.rs
//!
//! Writes the OpenAPI document for the streak API as pretty JSON.
//!
//! Usage: `openapi [PATH]`. The path defaults to `openapi.json`.

use api_lib::web::ApiDoc;
use utoipa::OpenApi;

const DEFAULT_PATH: &str = "openapi.json";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_PATH.to_string());
    let doc = ApiDoc::openapi();
    std::fs::write(&path, doc.to_pretty_json()?)?;
    println!(
        "Wrote {} paths of the streak API to {}",
        doc.paths.paths.len(),
        path
    );
    Ok(())
}

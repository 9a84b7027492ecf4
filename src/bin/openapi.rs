use anyhow::Result;

// Print the OpenAPI document for /auth and /health
fn main() -> Result<()> {
    let doc = authbridge::api::openapi().to_pretty_json()?;
    println!("{doc}");
    Ok(())
}

use crate::config::PolicyConfig;
use crate::policy::PolicyDocument;

/// Print the effective policy table as a policy document.
///
/// The output can be saved, edited, and passed back with `--policy`.
pub fn run_policy_command(config: &PolicyConfig) -> anyhow::Result<()> {
    let table = config.load_table()?;
    let document = PolicyDocument::from_table(&table);

    match &config.path {
        Some(path) => eprintln!("# {} rule(s) from {}", table.len(), path.display()),
        None => eprintln!("# {} built-in rule(s)", table.len()),
    }
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

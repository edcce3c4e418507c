use anyhow::{bail, Context};
use clap::{ArgGroup, Args, Parser, Subcommand};
use mme_core::load::{delete_by_query, load_demo};
use mme_core::{
    canonicalize, CoreConfig, FileRepository, IdentifierResolver, PatientFilter, PatientId,
    PatientRepository, RawPatient,
};
use mme_genes::{EnsemblClient, EnsemblConfig};
use mme_schema::{Mode, SchemaError};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mme")]
#[command(about = "Matchmaker Exchange node administration CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add patients to the local store
    #[command(subcommand)]
    Add(AddCommands),
    /// Remove patients from the local store
    #[command(subcommand)]
    Remove(RemoveCommands),
    /// List stored patients in wire form
    List,
    /// Validate a JSON document against the MME schema
    Validate {
        /// JSON file: a request (or response), or a list of patients
        file: PathBuf,
        /// Validate as a response instead of a request
        #[arg(long)]
        response: bool,
    },
    /// Print the canonical form of the patients in a file
    Canonicalize {
        /// JSON file containing one patient or a list of patients
        file: PathBuf,
        /// Resolve gene references through Ensembl
        #[arg(long)]
        ensembl: bool,
    },
}

#[derive(Subcommand)]
enum AddCommands {
    /// Load a JSON list of patients, skipping ones already stored
    Demo {
        /// JSON file containing a list of patients
        file: PathBuf,
        /// Resolve gene references through Ensembl
        #[arg(long)]
        ensembl: bool,
    },
}

#[derive(Subcommand)]
enum RemoveCommands {
    /// Remove patients by id or label
    Patient(RemovePatientArgs),
}

#[derive(Args)]
#[command(group(ArgGroup::new("selector").required(true).args(["id", "label"])))]
struct RemovePatientArgs {
    /// Exact patient id
    #[arg(long)]
    id: Option<String>,
    /// Exact patient label; every patient with this label is removed
    #[arg(long)]
    label: Option<String>,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mme_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Add(AddCommands::Demo { file, ensembl })) => {
            let cfg = CoreConfig::from_env()?;
            let repo = FileRepository::from_config(&cfg)?;
            let resolver = if ensembl {
                Some(ensembl_resolver(&cfg)?)
            } else {
                None
            };
            let inserted = load_demo(&file, &repo, resolver.as_ref());
            println!("Inserted {} patients from {}", inserted.len(), file.display());
        }
        Some(Commands::Remove(RemoveCommands::Patient(args))) => {
            let cfg = CoreConfig::from_env()?;
            let repo = FileRepository::from_config(&cfg)?;
            let filter = filter_from_args(args)?;
            let removed = delete_by_query(&filter, &repo)?;
            println!("Removed {removed} patients");
        }
        Some(Commands::List) => {
            let cfg = CoreConfig::from_env()?;
            let repo = FileRepository::from_config(&cfg)?;
            let patients = repo.list()?;
            if patients.is_empty() {
                println!("No patients found.");
            }
            for patient in patients {
                let wire = mme_core::to_wire(&patient)?;
                println!("{}", serde_json::to_string(&wire)?);
            }
        }
        Some(Commands::Validate { file, response }) => {
            let document = read_json(&file)?;
            let mode = if response { Mode::Response } else { Mode::Request };
            match validate_document(&document, mode) {
                Ok(()) => println!("{} is valid", file.display()),
                Err(SchemaError::Violations(violations)) => {
                    for violation in &violations {
                        println!("{violation}");
                    }
                    bail!("{} violates the MME schema", file.display());
                }
                Err(other) => return Err(other.into()),
            }
        }
        Some(Commands::Canonicalize { file, ensembl }) => {
            let resolver = if ensembl {
                Some(ensembl_resolver(&CoreConfig::from_env()?)?)
            } else {
                None
            };
            let canonical = canonicalize_document(read_json(&file)?, resolver.as_ref())?;
            println!("{}", serde_json::to_string_pretty(&canonical)?);
        }
        None => {
            println!("Use 'mme --help' for commands");
        }
    }

    Ok(())
}

fn ensembl_resolver(cfg: &CoreConfig) -> anyhow::Result<IdentifierResolver> {
    let client = EnsemblClient::new(EnsemblConfig {
        base_url: cfg.ensembl_url().to_owned(),
        request_timeout: cfg.gene_lookup_timeout(),
    })?;
    Ok(IdentifierResolver::new(Arc::new(client)))
}

fn filter_from_args(args: RemovePatientArgs) -> anyhow::Result<PatientFilter> {
    match (args.id, args.label) {
        (Some(id), None) => Ok(PatientFilter::ById(PatientId::new(id)?)),
        (None, Some(label)) => Ok(PatientFilter::ByLabel(label)),
        _ => bail!("exactly one of --id or --label is required"),
    }
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// A list is checked entry by entry against the patient definition; anything else is checked
/// as a whole request or response.
fn validate_document(document: &Value, mode: Mode) -> Result<(), SchemaError> {
    let Value::Array(entries) = document else {
        return mme_schema::validate(document, mode);
    };

    let mut violations = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        if let Err(err) = mme_schema::validate_definition(entry, "patient") {
            if !matches!(err, SchemaError::Violations(_)) {
                return Err(err);
            }
            violations.extend(err.violations().iter().cloned().map(|mut v| {
                v.path = format!("/{index}{}", v.path);
                v
            }));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::Violations(violations))
    }
}

fn canonicalize_document(
    document: Value,
    resolver: Option<&IdentifierResolver>,
) -> anyhow::Result<Value> {
    let canonical_value = |entry: Value| -> anyhow::Result<Value> {
        let patient = canonicalize(RawPatient::from_value(entry)?, resolver)?;
        Ok(Value::Object(patient.to_document()?))
    };

    match document {
        Value::Array(entries) => entries
            .into_iter()
            .map(canonical_value)
            .collect::<anyhow::Result<Vec<_>>>()
            .map(Value::Array),
        single => canonical_value(single),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patient(id: &str) -> Value {
        json!({
            "id": id,
            "contact": {"name": "Contact Name", "href": "mailto:contact_name@mail.com"},
            "features": [{"id": "HP:0100026"}],
            "inheritanceMode": null
        })
    }

    #[test]
    fn lists_are_validated_per_patient() {
        let mut bad = patient("b");
        bad.as_object_mut().unwrap().remove("contact");
        let err = validate_document(&json!([patient("a"), bad]), Mode::Request)
            .expect_err("second entry invalid");
        let paths: Vec<&str> = err.violations().iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["/1/contact"]);
    }

    #[test]
    fn single_documents_are_validated_by_mode() {
        let request = json!({"patient": patient("a")});
        assert!(validate_document(&request, Mode::Request).is_ok());
        assert!(validate_document(&request, Mode::Response).is_err());
    }

    #[test]
    fn canonicalizes_lists_and_single_patients() {
        let canonical = canonicalize_document(json!([patient("a")]), None).unwrap();
        assert_eq!(canonical[0]["_id"], "a");
        assert!(canonical[0].get("inheritanceMode").is_none());

        let single = canonicalize_document(patient("b"), None).unwrap();
        assert_eq!(single["_id"], "b");
    }

    #[test]
    fn remove_needs_exactly_one_selector() {
        let by_label = filter_from_args(RemovePatientArgs {
            id: None,
            label: Some("family A".into()),
        })
        .unwrap();
        assert_eq!(by_label, PatientFilter::ByLabel("family A".into()));

        assert!(filter_from_args(RemovePatientArgs {
            id: Some("a".into()),
            label: Some("b".into()),
        })
        .is_err());
    }
}

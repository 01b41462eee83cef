use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use database::{
    models::{NewUser, Role},
    users, Database,
};
use dataset::{SampleRequest, SymphoniaProbe, SyncOptions};
use tracing::{debug, info, instrument};

#[derive(Debug, clap::Parser)]
#[command(version, about = "Index audio datasets and draw weighted sample sets from them")]
struct Cli {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://dataset.db", global = true)]
    db: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Create the database tables
    InitDb {
        /// Also create `testuser` and `testadmin`, both with password `pass`
        #[arg(long)]
        create_test_user: bool,
    },
    /// Index audio files that are not in the database yet
    SyncDatasets {
        #[arg(long, env = "DATASETS_DIR", default_value = "datasets")]
        datasets_dir: PathBuf,
        /// Extra audio file extension, may be repeated
        #[arg(long = "extension")]
        extensions: Vec<String>,
    },
    /// Draw a new sample set from the indexed files
    CreateSamples {
        name: String,
        #[arg(allow_negative_numbers = true)]
        count: i64,
        /// Length of each sample in seconds
        #[arg(allow_negative_numbers = true)]
        duration: f64,
        #[arg(long, default_value = dataset::DEFAULT_SEED)]
        seed: String,
    },
    CreateUser {
        name: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        admin: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    {
        use tracing_subscriber::prelude::*;

        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(tracing_subscriber::EnvFilter::from_default_env())
            .init()
    }

    let cli = Cli::parse();
    let database = Database::open(&cli.db)
        .await
        .with_context(|| format!("failed to open database {}", cli.db))?;
    debug!(db = %cli.db, "database ready");

    match cli.command {
        Command::InitDb { create_test_user } => init_db(&database, create_test_user).await,
        Command::SyncDatasets {
            datasets_dir,
            extensions,
        } => sync_datasets(&database, datasets_dir, &extensions).await,
        Command::CreateSamples {
            name,
            count,
            duration,
            seed,
        } => {
            create_samples(
                &database,
                SampleRequest {
                    name,
                    count,
                    duration,
                    seed,
                },
            )
            .await
        }
        Command::CreateUser {
            name,
            password,
            admin,
        } => {
            let role = if admin { Role::Admin } else { Role::User };
            create_user(&database, &name, &password, role).await
        }
    }
}

async fn init_db(database: &Database, create_test_user: bool) -> anyhow::Result<()> {
    println!("Initialized the database");
    if !create_test_user {
        return Ok(());
    }

    for (name, role) in [("testuser", Role::User), ("testadmin", Role::Admin)] {
        let mut session = database.begin().await?;
        let user = NewUser {
            name,
            password: "pass",
            role,
        };
        match users::create_user(&mut session, &user).await {
            Ok(_) => {
                session.commit().await?;
                println!("Created user '{name}' with password 'pass'");
            }
            Err(err) if err.is_duplicate_name() => println!("'{name}' already exists"),
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}

#[instrument(skip(database), level = "trace")]
async fn sync_datasets(
    database: &Database,
    datasets_dir: PathBuf,
    extensions: &[String],
) -> anyhow::Result<()> {
    let options = extensions
        .iter()
        .fold(SyncOptions::default(), |options, ext| options.with_extension(ext));

    println!("Scanning {}", datasets_dir.display());
    let start = std::time::Instant::now();
    let report = dataset::sync(database.begin().await?, &datasets_dir, &SymphoniaProbe, &options)
        .await
        .with_context(|| format!("failed to sync {}", datasets_dir.display()))?;
    let elapsed = start.elapsed();
    info!(?elapsed, "completed sync");

    println!("Found {} files", report.found);
    println!("{} new files; {} skipped", report.inserted, report.skipped);

    Ok(())
}

#[instrument(skip(database), level = "trace")]
async fn create_samples(database: &Database, request: SampleRequest) -> anyhow::Result<()> {
    let generated = dataset::generate(database.begin().await?, &request)
        .await
        .with_context(|| format!("failed to create sample set '{}'", request.name))?;

    println!(
        "Created sample set {} ('{}') with {} samples",
        generated.sample_set.id,
        generated.sample_set.name,
        generated.samples.len()
    );

    Ok(())
}

async fn create_user(
    database: &Database,
    name: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<()> {
    let mut session = database.begin().await?;
    let user = users::create_user(
        &mut session,
        &NewUser {
            name,
            password,
            role,
        },
    )
    .await
    .with_context(|| format!("failed to create user '{name}'"))?;
    session.commit().await?;

    println!("Created user '{}' ({:?})", user.name, user.role);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn create_samples_arguments() {
        let cli = Cli::try_parse_from(["dataset_cli", "create-samples", "run-1", "5", "2.5"]).unwrap();
        match cli.command {
            Command::CreateSamples {
                name,
                count,
                duration,
                seed,
            } => {
                assert_eq!(name, "run-1");
                assert_eq!(count, 5);
                assert_eq!(duration, 2.5);
                assert_eq!(seed, dataset::DEFAULT_SEED);
            }
            other => panic!("parsed {other:?}"),
        }
    }

    #[test]
    fn negative_count_reaches_validation() {
        let cli = Cli::try_parse_from(["dataset_cli", "create-samples", "bad", "-3", "1.0"]).unwrap();
        assert!(matches!(cli.command, Command::CreateSamples { count: -3, .. }));
    }

    #[test]
    fn repeated_extensions() {
        let cli = Cli::try_parse_from([
            "dataset_cli",
            "--db",
            "sqlite::memory:",
            "sync-datasets",
            "--extension",
            "flac",
            "--extension",
            ".mp3",
        ])
        .unwrap();
        assert_eq!(cli.db, "sqlite::memory:");
        match cli.command {
            Command::SyncDatasets { extensions, .. } => assert_eq!(extensions, ["flac", ".mp3"]),
            other => panic!("parsed {other:?}"),
        }
    }

    #[tokio::test]
    async fn init_db_with_test_users_twice() {
        let database = Database::open("sqlite::memory:").await.unwrap();
        init_db(&database, true).await.unwrap();
        init_db(&database, true).await.unwrap();

        let mut session = database.begin().await.unwrap();
        let admin = users::user_by_name(&mut session, "testadmin")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(users::check_user_password(&admin, "pass").unwrap());
    }
}

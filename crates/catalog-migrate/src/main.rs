use anyhow::Context;
use catalog_sql::NodeName;
use clap::Parser;

#[derive(clap::Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Command,

    /// URL of the master Postgres database.
    #[clap(long = "master", env = "MASTER_DATABASE_URL")]
    master_url: String,
    /// URL of the slave_a Postgres database.
    #[clap(long = "slave-a", env = "SLAVE_A_DATABASE_URL")]
    slave_a_url: String,
    /// URL of the slave_b Postgres database.
    #[clap(long = "slave-b", env = "SLAVE_B_DATABASE_URL")]
    slave_b_url: String,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Create the master schema and the schema of every slave that's
    /// currently reachable.
    Migrate,
    /// Drop a single node's own tables.
    Rollback {
        /// One of `master`, `slave_a`, `slave_b`.
        #[clap(long)]
        node: NodeName,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let master = connect(&args.master_url, "master")
        .await
        .context("connecting to master")?;

    match args.command {
        Command::Migrate => {
            let mut slaves = Vec::new();
            for (node, url) in [
                (NodeName::SlaveA, &args.slave_a_url),
                (NodeName::SlaveB, &args.slave_b_url),
            ] {
                match connect(url, node.as_str()).await {
                    Ok(pool) => slaves.push((node, pool)),
                    Err(err) => {
                        tracing::warn!(node = node.as_str(), ?err, "slave unreachable, skipping its schema");
                    }
                }
            }
            catalog_migrate::run_migrations(&master, &slaves).await?;
        }
        Command::Rollback { node } => {
            let pool = match node {
                NodeName::Master => master,
                NodeName::SlaveA => connect(&args.slave_a_url, "slave_a").await?,
                NodeName::SlaveB => connect(&args.slave_b_url, "slave_b").await?,
            };
            catalog_migrate::rollback(&pool, node).await?;
        }
    }

    Ok(())
}

async fn connect(url: &str, label: &str) -> anyhow::Result<sqlx::PgPool> {
    sqlx::postgres::PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(10))
        .max_connections(5)
        .connect(url)
        .await
        .with_context(|| format!("connecting to {label}"))
}

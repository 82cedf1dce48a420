use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use crate::db::{ContactStore, OnClientDelete};
use crate::error::StoreError;
use crate::models::{render_rows, ClientFilter, ClientUpdate};

#[derive(Parser, Debug)]
#[command(name = "contact_manager", about = "Manage clients and their phone numbers")]
pub struct Cli {
    /// Credentials file with a [db_creds] section (default: db_creds.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Drop and recreate the client and phone tables
    Init {
        /// Declare ON DELETE CASCADE on phone.client_id
        #[arg(long)]
        cascade: bool,
    },
    /// Add a client, optionally with a first phone number
    AddClient {
        first_name: String,
        last_name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Attach a phone number to an existing client
    AddPhone { client_id: i32, phone: String },
    /// Change a client's fields
    Update {
        client_id: i32,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        /// Existing number to overwrite when the client has several
        #[arg(long)]
        replace: Option<String>,
    },
    /// Delete a phone number
    RemovePhone { phone: String },
    /// Delete a client and all of its phone numbers
    RemoveClient { client_id: i32 },
    /// Print a single client
    Show { client_id: i32 },
    /// List a client's phone numbers
    Phones { client_id: i32 },
    /// Match each term against names, email and phone numbers
    Search {
        #[arg(required = true)]
        terms: Vec<String>,
    },
    /// Search by named fields
    Find {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Reset the schema and run the sample session
    Demo,
}

pub async fn run(store: &mut ContactStore, command: Command) -> Result<()> {
    match command {
        Command::Init { cascade } => {
            let on_delete = if cascade {
                OnClientDelete::Cascade
            } else {
                OnClientDelete::Restrict
            };
            store.initialize_schema(on_delete).await?;
            println!("Schema initialized");
        }
        Command::AddClient {
            first_name,
            last_name,
            email,
            phone,
        } => {
            let client_id = store
                .add_client(&first_name, &last_name, email.as_deref(), phone.as_deref())
                .await?;
            println!("{client_id}");
        }
        Command::AddPhone { client_id, phone } => {
            let phone_id = store.add_phone_number(client_id, &phone).await?;
            println!("{phone_id}");
        }
        Command::Update {
            client_id,
            first_name,
            last_name,
            email,
            phone,
            replace,
        } => {
            let update = ClientUpdate {
                first_name,
                last_name,
                email,
                phone_number: phone,
                replace_phone: replace,
            };
            if update.is_empty() {
                bail!("nothing to update for client {client_id}");
            }
            let mut stdin = BufReader::new(tokio::io::stdin());
            let mut stdout = tokio::io::stdout();
            update_interactive(store, client_id, update, &mut stdin, &mut stdout).await?;
        }
        Command::RemovePhone { phone } => {
            if store.phone_id(&phone).await?.is_none() {
                warn!(phone = %phone, "no phone row holds this number");
            }
            let removed = store.remove_phone_number(&phone).await?;
            println!("{removed}");
        }
        Command::RemoveClient { client_id } => {
            let removed = store.remove_client(client_id).await?;
            println!("{removed}");
        }
        Command::Show { client_id } => match store.get_client(client_id).await? {
            Some(client) => println!("{client}"),
            None => bail!("client {client_id} not found"),
        },
        Command::Phones { client_id } => {
            let phones = store.phone_numbers(client_id).await?;
            let numbers: Vec<&str> = phones.iter().map(|p| p.phone_number.as_str()).collect();
            println!("{}", numbers.join(" "));
        }
        Command::Search { terms } => {
            let clients = store.search(&terms).await?;
            println!("{}", render_rows(&clients));
        }
        Command::Find {
            first_name,
            last_name,
            email,
            phone,
        } => {
            let filter = ClientFilter {
                first_name,
                last_name,
                email,
                phone_number: phone,
            };
            let clients = store.find(&filter).await?;
            println!("{}", render_rows(&clients));
        }
        Command::Demo => demo(store).await?,
    }

    Ok(())
}

/// Runs the update, asking which number to replace when the store cannot
/// decide on its own. Returns whether the client exists.
pub async fn update_interactive<R, W>(
    store: &mut ContactStore,
    client_id: i32,
    update: ClientUpdate,
    reader: &mut R,
    writer: &mut W,
) -> Result<bool>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let exists = store.get_client(client_id).await?.is_some();
    if !exists {
        warn!(client_id, "no client row has this id");
    }

    match store.update_client(client_id, &update).await {
        Err(StoreError::AmbiguousPhone { numbers, .. }) if update.replace_phone.is_none() => {
            let old = prompt_replacement(reader, writer, &numbers).await?;
            store
                .update_client(client_id, &update.with_replace_phone(old))
                .await?;
        }
        other => other?,
    }

    Ok(exists)
}

pub async fn prompt_replacement<R, W>(reader: &mut R, writer: &mut W, numbers: &[String]) -> Result<String>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let prompt = format!(
        "Current numbers: {}\nEnter the client's previous phone number (11 digits) to replace:\n",
        numbers.join(" ")
    );
    writer.write_all(prompt.as_bytes()).await?;
    writer.flush().await?;

    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        bail!("no phone number given to replace");
    }

    let old = line.trim();
    if old.is_empty() {
        bail!("no phone number given to replace");
    }
    Ok(old.to_owned())
}

/// The sample session: two clients, extra phones, an update, removals and a search
pub async fn demo(store: &mut ContactStore) -> Result<()> {
    store.initialize_schema(OnClientDelete::Restrict).await?;

    let elizabeth = store
        .add_client("Elizabeth", "Olsen", Some("elizabeth@olsen.com"), Some("08541324794"))
        .await?;
    let vanessa = store
        .add_client("Vanessa", "Kirby", Some("vanessa@kirby.com"), Some("41653287903"))
        .await?;
    info!(elizabeth, vanessa, "sample clients added");

    store.add_phone_number(elizabeth, "49742314580").await?;
    store.add_phone_number(vanessa, "18756378952").await?;
    store.add_phone_number(vanessa, "78361825908").await?;

    let update = ClientUpdate {
        first_name: Some("Charlotte".into()),
        last_name: Some("Riley".into()),
        email: Some("charlotte@riley.com".into()),
        phone_number: Some("27330945174".into()),
        replace_phone: Some("41653287903".into()),
    };
    store.update_client(vanessa, &update).await?;

    store.remove_phone_number("18756378952").await?;
    store.remove_client(elizabeth).await?;

    let found = store.search(&["Riley".to_owned()]).await?;
    println!("{}", render_rows(&found));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::fresh_store;

    #[test]
    fn no_subcommand_means_demo() {
        let cli = Cli::try_parse_from(["contact_manager"]).unwrap();
        assert_eq!(cli.command, None);
    }

    #[test]
    fn parses_update_with_replace() {
        let cli = Cli::try_parse_from([
            "contact_manager",
            "update",
            "2",
            "--first-name",
            "Charlotte",
            "--phone",
            "27330945174",
            "--replace",
            "41653287903",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Update {
                client_id: 2,
                first_name: Some("Charlotte".into()),
                last_name: None,
                email: None,
                phone: Some("27330945174".into()),
                replace: Some("41653287903".into()),
            })
        );
    }

    #[test]
    fn parses_show_and_phones() {
        let cli = Cli::try_parse_from(["contact_manager", "show", "2"]).unwrap();
        assert_eq!(cli.command, Some(Command::Show { client_id: 2 }));
        let cli = Cli::try_parse_from(["contact_manager", "phones", "2"]).unwrap();
        assert_eq!(cli.command, Some(Command::Phones { client_id: 2 }));
        assert!(Cli::try_parse_from(["contact_manager", "show", "two"]).is_err());
    }

    #[test]
    fn search_requires_a_term() {
        assert!(Cli::try_parse_from(["contact_manager", "search"]).is_err());
    }

    #[test]
    fn global_config_flag() {
        let cli =
            Cli::try_parse_from(["contact_manager", "init", "--cascade", "--config", "creds.toml"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("creds.toml")));
        assert_eq!(cli.command, Some(Command::Init { cascade: true }));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn ambiguous_update_asks_and_replaces_the_typed_number() {
        let (_guard, mut store) = fresh_store(OnClientDelete::Restrict).await;
        let id = store
            .add_client("Vanessa", "Kirby", None, Some("41653287903"))
            .await
            .unwrap();
        store.add_phone_number(id, "18756378952").await.unwrap();
        store.add_phone_number(id, "78361825908").await.unwrap();
        let target = store.phone_id("18756378952").await.unwrap().unwrap();

        let update = ClientUpdate {
            last_name: Some("Riley".into()),
            phone_number: Some("27330945174".into()),
            ..Default::default()
        };
        let mut input: &[u8] = b"18756378952\n";
        let mut output = Vec::new();
        let exists = update_interactive(&mut store, id, update, &mut input, &mut output)
            .await
            .unwrap();
        assert!(exists);
        assert!(String::from_utf8(output).unwrap().contains("41653287903 18756378952 78361825908"));

        let phones = store.phone_numbers(id).await.unwrap();
        let numbers: Vec<&str> = phones.iter().map(|p| p.phone_number.as_str()).collect();
        assert_eq!(numbers, vec!["41653287903", "27330945174", "78361825908"]);
        assert_eq!(phones[1].phone_id, target);
        assert_eq!(store.get_client(id).await.unwrap().unwrap().last_name, "Riley");
        store.close().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn unambiguous_update_does_not_prompt() {
        let (_guard, mut store) = fresh_store(OnClientDelete::Restrict).await;
        let id = store
            .add_client("Vanessa", "Kirby", None, Some("41653287903"))
            .await
            .unwrap();

        let update = ClientUpdate {
            phone_number: Some("27330945174".into()),
            ..Default::default()
        };
        let mut input: &[u8] = b"";
        let mut output = Vec::new();
        update_interactive(&mut store, id, update, &mut input, &mut output)
            .await
            .unwrap();
        assert!(output.is_empty());
        assert!(store.phone_id("27330945174").await.unwrap().is_some());
        store.close().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn update_of_unknown_client_reports_it_missing() {
        let (_guard, mut store) = fresh_store(OnClientDelete::Restrict).await;
        let update = ClientUpdate {
            first_name: Some("X".into()),
            ..Default::default()
        };
        let mut input: &[u8] = b"";
        let mut output = Vec::new();
        let exists = update_interactive(&mut store, 99, update, &mut input, &mut output)
            .await
            .unwrap();
        assert!(!exists);
        assert!(store.get_client(99).await.unwrap().is_none());
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn prompt_reads_trimmed_number() {
        let mut input: &[u8] = b"  18756378952 \n";
        let mut output = Vec::new();
        let numbers = vec!["41653287903".to_owned(), "18756378952".to_owned()];

        let old = prompt_replacement(&mut input, &mut output, &numbers)
            .await
            .unwrap();

        assert_eq!(old, "18756378952");
        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("41653287903 18756378952"));
        assert!(shown.contains("previous phone number"));
    }

    #[tokio::test]
    async fn prompt_rejects_empty_input() {
        let mut input: &[u8] = b"";
        let mut output = Vec::new();
        assert!(prompt_replacement(&mut input, &mut output, &[]).await.is_err());

        let mut input: &[u8] = b"\n";
        assert!(prompt_replacement(&mut input, &mut output, &[]).await.is_err());
    }
}

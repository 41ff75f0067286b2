// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod agree;
mod browse;
mod config;
mod manage;
mod runtime;
mod server;

use anyhow::{Context, Result, anyhow, bail};
use browse::BrowseOptions;
use config::Config;
use manage::{DRAFT_FLAGS, Decision, Refusal};
use runtime::{RemoteRuntime, StoreRuntime};
use server::Site;
use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trinity_app::{AgreeRejection, CommentId, ItemDraft, ItemId, User, ViewMode};
use trinity_db::Store;
use trinity_view::{CatalogRuntime, Renderer};
use url::Url;

const USER_HINT: &str = "set [client].user or pass --user NAME";

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    init_logging();

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `trinity --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let db_path = if options.demo {
        PathBuf::from(":memory:")
    } else {
        config.db_path()?
    };
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    let renderer = Renderer::new(config.description_budget());
    let user = options.user.as_deref().or(config.client_user());

    // Remote commands never touch the local database.
    if let Some((base_url, task)) = options.command.remote_task() {
        let base_url = base_url.unwrap_or(config.client_base_url());
        let client =
            trinity_client::Client::new(base_url, config.client_timeout()?)?.with_user(user);
        if options.check_only {
            return Ok(());
        }
        let mut runtime = RemoteRuntime::new(client);
        let mut stdout = io::stdout().lock();
        return match task {
            RemoteTask::Browse(browse_options) => {
                run_browse(&mut runtime, renderer, &config, browse_options, &mut stdout)
            }
            RemoteTask::Agree(item) => {
                let listing = Url::parse(base_url)
                    .with_context(|| format!("parse base URL {base_url:?}"))?;
                run_agree(&mut runtime, &listing, item, 0, &mut stdout)
            }
        };
    }

    let store = Store::open(&db_path).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [storage].db_path or TRINITY_DB_PATH",
            db_path.display()
        )
    })?;
    store.bootstrap()?;
    if options.demo {
        let seeded = store.seed_demo_data()?;
        info!(seeded, "demo catalog ready");
    }
    if options.check_only {
        return Ok(());
    }

    let mut stdout = io::stdout().lock();
    dispatch(&store, renderer, &config, user, &options.command, &mut stdout)
}

/// Run `command` against the local store, acting as `user` where the
/// command changes something.
fn dispatch<W: Write>(
    store: &Store,
    renderer: Renderer,
    config: &Config,
    user: Option<&str>,
    command: &Command,
    out: &mut W,
) -> Result<()> {
    match command {
        Command::Serve { addr } => {
            let addr = addr.as_deref().unwrap_or(config.server_addr());
            let site = Site::new(store, renderer, config.view_mode(), addr)?
                .with_filter_strategy(config.filter_strategy());
            server::serve(&site, addr)
        }
        // Reading needs no identity.
        Command::Browse(browse_options) => {
            let mut runtime = StoreRuntime::new(store);
            run_browse(&mut runtime, renderer, config, browse_options, out)
        }
        Command::Agree { item, .. } => {
            let mut runtime = StoreRuntime::new(store).as_user(user)?;
            let displayed = store
                .item_detail(*item)?
                .map_or(0, |detail| detail.item.agree_count);
            let listing = Url::parse(config.client_base_url())
                .with_context(|| format!("parse [client].base_url {:?}", config.client_base_url()))?;
            run_agree(&mut runtime, &listing, *item, displayed, out)
        }
        Command::Add { edits } => {
            let actor = acting_user(store, user)?;
            let mut draft = ItemDraft::default();
            manage::apply_edits(&mut draft, edits)?;
            let id = decided(manage::add_item(store, actor.as_ref(), &draft)?, "add item")?;
            writeln!(out, "created item {id}")?;
            Ok(())
        }
        Command::Edit { item, edits } => {
            let actor = acting_user(store, user)?;
            decided(
                manage::edit_item(store, actor.as_ref(), *item, edits)?,
                &format!("edit item {item}"),
            )?;
            writeln!(out, "updated item {item}")?;
            Ok(())
        }
        Command::Delete { item } => {
            let actor = acting_user(store, user)?;
            decided(
                manage::delete_item(store, actor.as_ref(), *item)?,
                &format!("delete item {item}"),
            )?;
            writeln!(out, "deleted item {item}")?;
            Ok(())
        }
        Command::Comment { item, content } => {
            let actor = acting_user(store, user)?;
            let id = decided(
                manage::add_comment(store, actor.as_ref(), *item, content)?,
                &format!("comment on item {item}"),
            )?;
            writeln!(out, "posted comment {id} on item {item}")?;
            Ok(())
        }
        Command::DeleteComment { comment } => {
            let actor = acting_user(store, user)?;
            let item = decided(
                manage::delete_comment(store, actor.as_ref(), *comment)?,
                &format!("delete comment {comment}"),
            )?;
            writeln!(out, "deleted comment {comment} from item {item}")?;
            Ok(())
        }
        Command::Import { path } => {
            let summary = store.import_csv_path(path, None)?;
            writeln!(
                out,
                "imported {} items, skipped {} rows",
                summary.imported, summary.skipped
            )?;
            Ok(())
        }
        Command::Export { path } => {
            let count = store.export_csv_path(path)?;
            writeln!(out, "exported {count} items to {}", path.display())?;
            Ok(())
        }
        Command::AddUser { name, admin } => {
            let id = store.create_user(name, *admin)?;
            writeln!(out, "created user {name} (id {id})")?;
            Ok(())
        }
    }
}

/// Resolve the acting user. A name that is set but unknown is an error.
fn acting_user(store: &Store, name: Option<&str>) -> Result<Option<User>> {
    let Some(name) = name else {
        return Ok(None);
    };
    match store.find_user(name)? {
        Some(user) => Ok(Some(user)),
        None => bail!("unknown user {name:?} -- create it with `trinity add-user {name}`"),
    }
}

fn decided<T>(decision: Decision<T>, action: &str) -> Result<T> {
    decision.map_err(|refusal| match refusal {
        Refusal::NotLoggedIn => anyhow!("{action}: {} -- {USER_HINT}", refusal.message()),
        other => anyhow!("{action}: {}", other.message()),
    })
}

fn run_agree<R: CatalogRuntime, W: Write>(
    runtime: &mut R,
    listing: &Url,
    item: ItemId,
    displayed: u64,
    out: &mut W,
) -> Result<()> {
    let report = agree::agree(runtime, listing, item, displayed)?;
    if !report.agreed {
        if report.message == AgreeRejection::NotLoggedIn.message() {
            bail!("agree item {item}: {} -- {USER_HINT}", report.message);
        }
        bail!("agree item {item}: {}", report.message);
    }
    writeln!(out, "{} (item {item}, agree count {})", report.message, report.count)?;
    Ok(())
}

fn run_browse<R: CatalogRuntime, W: Write>(
    runtime: &mut R,
    renderer: Renderer,
    config: &Config,
    options: &BrowseOptions,
    out: &mut W,
) -> Result<()> {
    let view = options.view.unwrap_or_else(|| config.view_mode());
    let summary = browse::browse(
        runtime,
        renderer,
        view,
        config.trigger_margin(),
        options,
        out,
    )?;
    eprintln!(
        "{} items over {} pages{}",
        summary.items,
        summary.pages,
        if summary.has_more {
            "; more available"
        } else {
            ""
        }
    );
    Ok(())
}

fn init_logging() {
    let directives = env::var("TRINITY_LOG")
        .or_else(|_| env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_owned());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directives))
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Serve {
        addr: Option<String>,
    },
    Browse(BrowseOptions),
    Agree {
        item: ItemId,
        remote: bool,
        base_url: Option<String>,
    },
    /// `(flag, value)` pairs, see [`DRAFT_FLAGS`].
    Add {
        edits: Vec<(String, String)>,
    },
    Edit {
        item: ItemId,
        edits: Vec<(String, String)>,
    },
    Delete {
        item: ItemId,
    },
    Comment {
        item: ItemId,
        content: String,
    },
    DeleteComment {
        comment: CommentId,
    },
    Import {
        path: PathBuf,
    },
    Export {
        path: PathBuf,
    },
    AddUser {
        name: String,
        admin: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemoteTask<'a> {
    Browse(&'a BrowseOptions),
    Agree(ItemId),
}

impl Command {
    /// The server override and task for commands aimed at a remote site.
    fn remote_task(&self) -> Option<(Option<&str>, RemoteTask<'_>)> {
        match self {
            Self::Browse(options) if options.remote => {
                Some((options.base_url.as_deref(), RemoteTask::Browse(options)))
            }
            Self::Agree {
                item,
                remote: true,
                base_url,
            } => Some((base_url.as_deref(), RemoteTask::Agree(*item))),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_db_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
    user: Option<String>,
    command: Command,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_db_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
        user: None,
        command: Command::Serve { addr: None },
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-path" => {
                options.print_db_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            "--user" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--user requires a username"))?;
                options.user = Some(value.as_ref().to_owned());
            }
            "serve" | "browse" | "agree" | "add" | "edit" | "delete" | "comment"
            | "delete-comment" | "import" | "export" | "add-user" => {
                let name = arg.as_ref().to_owned();
                let rest: Vec<String> = iter.map(|arg| arg.as_ref().to_owned()).collect();
                options.command = parse_command(&name, &rest)?;
                return Ok(options);
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn parse_command(name: &str, args: &[String]) -> Result<Command> {
    let mut iter = args.iter();
    match name {
        "serve" => {
            let mut addr = None;
            while let Some(arg) = iter.next() {
                match arg.as_str() {
                    "--addr" => addr = Some(value_for("--addr", &mut iter)?),
                    other => bail!("unknown serve argument {other:?}; expected --addr <host:port>"),
                }
            }
            Ok(Command::Serve { addr })
        }
        "browse" => {
            let mut options = BrowseOptions::default();
            while let Some(arg) = iter.next() {
                match arg.as_str() {
                    "--view" => {
                        let raw = value_for("--view", &mut iter)?;
                        options.view = Some(ViewMode::parse(&raw).ok_or_else(|| {
                            anyhow!("--view must be card or table, got {raw:?}")
                        })?);
                    }
                    "--field" => options.field = Some(value_for("--field", &mut iter)?),
                    "--search" => options.search = Some(value_for("--search", &mut iter)?),
                    "--pages" => {
                        let raw = value_for("--pages", &mut iter)?;
                        options.pages = raw
                            .parse()
                            .ok()
                            .filter(|pages| *pages > 0)
                            .ok_or_else(|| anyhow!("--pages must be a positive integer, got {raw:?}"))?;
                    }
                    "--remote" => options.remote = true,
                    "--base-url" => {
                        options.base_url = Some(value_for("--base-url", &mut iter)?);
                        options.remote = true;
                    }
                    other => bail!(
                        "unknown browse argument {other:?}; run with --help to see supported options"
                    ),
                }
            }
            Ok(Command::Browse(options))
        }
        "agree" => {
            let mut item = None;
            let mut remote = false;
            let mut base_url = None;
            while let Some(arg) = iter.next() {
                match arg.as_str() {
                    "--remote" => remote = true,
                    "--base-url" => {
                        base_url = Some(value_for("--base-url", &mut iter)?);
                        remote = true;
                    }
                    flag if flag.starts_with("--") => {
                        bail!("unknown agree argument {flag:?}; expected --remote or --base-url URL")
                    }
                    raw if item.is_none() => item = Some(ItemId::new(parse_id(raw)?)),
                    extra => bail!("agree takes one item id, got extra {extra:?}"),
                }
            }
            let item = item.ok_or_else(|| anyhow!("agree requires an item id"))?;
            Ok(Command::Agree {
                item,
                remote,
                base_url,
            })
        }
        "add" => Ok(Command::Add {
            edits: parse_draft_flags(name, args)?,
        }),
        "edit" => {
            let (raw, rest) = args
                .split_first()
                .ok_or_else(|| anyhow!("edit requires an item id"))?;
            let item = ItemId::new(parse_id(raw)?);
            let edits = parse_draft_flags(name, rest)?;
            if edits.is_empty() {
                bail!("edit needs at least one of {}", DRAFT_FLAGS.join(", "));
            }
            Ok(Command::Edit { item, edits })
        }
        "delete" | "delete-comment" => {
            let raw = match args {
                [raw] => raw,
                _ => bail!("{name} takes exactly one id"),
            };
            let id = parse_id(raw)?;
            Ok(if name == "delete" {
                Command::Delete {
                    item: ItemId::new(id),
                }
            } else {
                Command::DeleteComment {
                    comment: CommentId::new(id),
                }
            })
        }
        "comment" => {
            let (raw, words) = args
                .split_first()
                .ok_or_else(|| anyhow!("comment requires an item id and text"))?;
            let item = ItemId::new(parse_id(raw)?);
            let content = words.join(" ");
            if content.trim().is_empty() {
                bail!("comment requires text after the item id");
            }
            Ok(Command::Comment { item, content })
        }
        "import" | "export" => {
            let path = match args {
                [path] => PathBuf::from(path),
                _ => bail!("{name} takes exactly one CSV file path"),
            };
            Ok(if name == "import" {
                Command::Import { path }
            } else {
                Command::Export { path }
            })
        }
        "add-user" => {
            let mut username = None;
            let mut admin = false;
            for arg in args {
                match arg.as_str() {
                    "--admin" => admin = true,
                    flag if flag.starts_with("--") => {
                        bail!("unknown add-user argument {flag:?}; only --admin is supported")
                    }
                    name if username.is_none() => username = Some(name.to_owned()),
                    extra => bail!("add-user takes one username, got extra {extra:?}"),
                }
            }
            let name = username.ok_or_else(|| anyhow!("add-user requires a username"))?;
            Ok(Command::AddUser { name, admin })
        }
        other => bail!("unknown command {other:?}"),
    }
}

fn parse_id(raw: &str) -> Result<i64> {
    raw.parse()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| anyhow!("ids are positive integers, got {raw:?}"))
}

fn parse_draft_flags(command: &str, args: &[String]) -> Result<Vec<(String, String)>> {
    let mut edits = Vec::new();
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        if !DRAFT_FLAGS.contains(&flag.as_str()) {
            bail!(
                "unknown {command} argument {flag:?}; expected one of {}",
                DRAFT_FLAGS.join(", ")
            );
        }
        edits.push((flag.clone(), value_for(flag, &mut iter)?));
    }
    Ok(edits)
}

fn value_for<'a>(flag: &str, iter: &mut impl Iterator<Item = &'a String>) -> Result<String> {
    iter.next()
        .cloned()
        .ok_or_else(|| anyhow!("{flag} requires a value"))
}

fn print_help() {
    println!("trinity - browse the Impossible Trinity catalog");
    println!();
    println!("usage: trinity [options] [command]");
    println!();
    println!("commands:");
    println!("  serve [--addr host:port]     Serve the catalog site (default)");
    println!("  browse [--view card|table] [--field F] [--search S] [--pages N]");
    println!("         [--remote] [--base-url URL]");
    println!("                               Page through the listing and print each fragment;");
    println!("                               --remote reads from [client].base_url");
    println!("  agree <id> [--remote] [--base-url URL]");
    println!("                               Agree with an item as the configured user");
    println!("  add --name N --field F --element1 A --element2 B --element3 C [...]");
    println!("                               Create an item");
    println!("  edit <id> [--name N] [--description D] [...]");
    println!("                               Change an item you wrote (admins: any item)");
    println!("  delete <id>                  Delete an item you wrote (admins: any item)");
    println!("  comment <id> <text>          Comment on an item");
    println!("  delete-comment <id>          Remove a comment (admins only)");
    println!("  import <file.csv>            Import items from CSV");
    println!("  export <file.csv>            Export all items to CSV");
    println!("  add-user <name> [--admin]    Create a user");
    println!();
    println!("options:");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved database path");
    println!("  --print-example-config   Print a config template");
    println!("  --user <name>            Act as this user (overrides [client].user)");
    println!("  --demo                   Run against seeded demo data (in-memory)");
    println!("  --check                  Validate config + DB and exit");
    println!("  --help                   Show this help");
    println!();
    println!("item flags: {}", DRAFT_FLAGS.join(" "));
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, Command, RemoteTask, dispatch, parse_cli_args};
    use crate::browse::BrowseOptions;
    use crate::config::Config;
    use anyhow::Result;
    use std::path::PathBuf;
    use trinity_app::{CommentId, ItemId, ViewMode};
    use trinity_db::Store;
    use trinity_testkit::TrinityFaker;
    use trinity_view::Renderer;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/trinity-config.toml")
    }

    fn catalog() -> Result<Store> {
        let store = Store::open_memory()?;
        store.bootstrap()?;
        let mut faker = TrinityFaker::new(13);
        for _ in 0..3 {
            store.create_item(&faker.draft(), None)?;
        }
        store.create_user("alice", false)?;
        store.create_user("bob", false)?;
        store.create_user("root", true)?;
        Ok(store)
    }

    fn run_command(store: &Store, user: Option<&str>, command: Command) -> Result<String> {
        let mut out = Vec::new();
        dispatch(
            store,
            Renderer::default(),
            &Config::default(),
            user,
            &command,
            &mut out,
        )?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn parse_cli_args_defaults_to_serve() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                print_config_path: false,
                print_db_path: false,
                demo: false,
                print_example: false,
                check_only: false,
                show_help: false,
                user: None,
                command: Command::Serve { addr: None },
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_path_override() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/config.toml"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_config_value() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_flags_before_command() -> Result<()> {
        let options = parse_cli_args(
            vec!["--demo", "--check", "serve", "--addr", "0.0.0.0:9000"],
            default_options_path(),
        )?;
        assert!(options.demo);
        assert!(options.check_only);
        assert_eq!(
            options.command,
            Command::Serve {
                addr: Some("0.0.0.0:9000".to_owned())
            }
        );
        Ok(())
    }

    #[test]
    fn parse_browse_options() -> Result<()> {
        let options = parse_cli_args(
            vec![
                "browse",
                "--view",
                "table",
                "--field",
                "Economics",
                "--pages",
                "3",
                "--base-url",
                "http://127.0.0.1:5002",
            ],
            default_options_path(),
        )?;
        assert_eq!(
            options.command,
            Command::Browse(BrowseOptions {
                view: Some(ViewMode::Table),
                field: Some("Economics".to_owned()),
                search: None,
                pages: 3,
                remote: true,
                base_url: Some("http://127.0.0.1:5002".to_owned()),
            })
        );
        Ok(())
    }

    #[test]
    fn browse_rejects_bad_values() {
        for args in [
            vec!["browse", "--view", "grid"],
            vec!["browse", "--pages", "0"],
            vec!["browse", "--field"],
            vec!["browse", "--sort", "name"],
        ] {
            assert!(
                parse_cli_args(args.clone(), default_options_path()).is_err(),
                "{args:?} should fail"
            );
        }
    }

    #[test]
    fn parse_transfer_and_user_commands() -> Result<()> {
        let import = parse_cli_args(vec!["import", "items.csv"], default_options_path())?;
        assert_eq!(
            import.command,
            Command::Import {
                path: PathBuf::from("items.csv")
            }
        );
        let export = parse_cli_args(vec!["export", "out.csv"], default_options_path())?;
        assert_eq!(
            export.command,
            Command::Export {
                path: PathBuf::from("out.csv")
            }
        );
        let user = parse_cli_args(vec!["add-user", "alice", "--admin"], default_options_path())?;
        assert_eq!(
            user.command,
            Command::AddUser {
                name: "alice".to_owned(),
                admin: true
            }
        );
        assert!(parse_cli_args(vec!["import"], default_options_path()).is_err());
        assert!(parse_cli_args(vec!["add-user"], default_options_path()).is_err());
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_help_flag_for_long_and_short_variants() -> Result<()> {
        let long = parse_cli_args(vec!["--help"], default_options_path())?;
        assert!(long.show_help);

        let short = parse_cli_args(vec!["-h"], default_options_path())?;
        assert!(short.show_help);
        Ok(())
    }

    #[test]
    fn parse_catalog_commands() -> Result<()> {
        let agree = parse_cli_args(
            vec!["--user", "alice", "agree", "7", "--base-url", "http://127.0.0.1:5002"],
            default_options_path(),
        )?;
        assert_eq!(agree.user.as_deref(), Some("alice"));
        assert_eq!(
            agree.command,
            Command::Agree {
                item: ItemId::new(7),
                remote: true,
                base_url: Some("http://127.0.0.1:5002".to_owned()),
            }
        );
        assert_eq!(
            agree.command.remote_task(),
            Some((Some("http://127.0.0.1:5002"), RemoteTask::Agree(ItemId::new(7))))
        );

        let edit = parse_cli_args(
            vec!["edit", "3", "--description", "Pick two."],
            default_options_path(),
        )?;
        assert_eq!(
            edit.command,
            Command::Edit {
                item: ItemId::new(3),
                edits: vec![("--description".to_owned(), "Pick two.".to_owned())],
            }
        );
        assert_eq!(edit.command.remote_task(), None);

        let comment = parse_cli_args(vec!["comment", "3", "pick", "two"], default_options_path())?;
        assert_eq!(
            comment.command,
            Command::Comment {
                item: ItemId::new(3),
                content: "pick two".to_owned(),
            }
        );

        for args in [
            vec!["agree"],
            vec!["agree", "0"],
            vec!["agree", "1", "2"],
            vec!["edit", "3"],
            vec!["edit", "3", "--colour", "red"],
            vec!["add", "--name"],
            vec!["delete", "x"],
            vec!["comment", "3"],
            vec!["--user"],
        ] {
            assert!(
                parse_cli_args(args.clone(), default_options_path()).is_err(),
                "{args:?} should fail"
            );
        }
        Ok(())
    }

    #[test]
    fn browse_ignores_an_unknown_configured_user() -> Result<()> {
        let store = catalog()?;
        let output = run_command(&store, Some("ghost"), Command::Browse(BrowseOptions::default()))?;
        assert!(!output.trim().is_empty());
        Ok(())
    }

    #[test]
    fn agree_command_reports_server_count_and_refusals() -> Result<()> {
        let store = catalog()?;
        let agree = Command::Agree {
            item: ItemId::new(1),
            remote: false,
            base_url: None,
        };

        let output = run_command(&store, Some("alice"), agree.clone())?;
        assert!(output.contains("agree count 1"), "{output}");

        let repeat = run_command(&store, Some("alice"), agree.clone())
            .expect_err("second agree should be refused");
        assert!(repeat.to_string().contains("already agreed"));

        let anonymous =
            run_command(&store, None, agree.clone()).expect_err("anonymous agree should fail");
        assert!(anonymous.to_string().contains("--user"));

        let ghost = run_command(&store, Some("ghost"), agree).expect_err("unknown user should fail");
        assert!(ghost.to_string().contains("trinity add-user ghost"));

        assert_eq!(
            store.item_detail(ItemId::new(1))?.map(|detail| detail.item.agree_count),
            Some(1)
        );
        Ok(())
    }

    #[test]
    fn item_and_comment_commands_check_the_acting_user() -> Result<()> {
        let store = catalog()?;
        let add = parse_cli_args(
            vec![
                "add",
                "--name",
                "CAP",
                "--field",
                "Computer Science",
                "--element1",
                "Consistency",
                "--element2",
                "Availability",
                "--element3",
                "Partition tolerance",
            ],
            default_options_path(),
        )?
        .command;
        let anonymous = run_command(&store, None, add.clone()).expect_err("adding needs a user");
        assert!(anonymous.to_string().contains("--user"));
        assert_eq!(run_command(&store, Some("alice"), add)?.trim(), "created item 4");

        let item = ItemId::new(4);
        let rename = Command::Edit {
            item,
            edits: vec![("--name".to_owned(), "Brewer".to_owned())],
        };
        let refused = run_command(&store, Some("bob"), rename.clone())
            .expect_err("bob did not write the item");
        assert!(refused.to_string().contains("permission"));
        run_command(&store, Some("alice"), rename)?;
        assert_eq!(store.get_item(item)?.name, "Brewer");

        let posted = run_command(
            &store,
            Some("bob"),
            Command::Comment {
                item,
                content: "Pick two.".to_owned(),
            },
        )?;
        assert_eq!(posted.trim(), "posted comment 1 on item 4");
        let remove = Command::DeleteComment {
            comment: CommentId::new(1),
        };
        assert!(run_command(&store, Some("bob"), remove.clone()).is_err());
        assert_eq!(
            run_command(&store, Some("root"), remove)?.trim(),
            "deleted comment 1 from item 4"
        );

        assert!(run_command(&store, Some("bob"), Command::Delete { item }).is_err());
        run_command(&store, Some("alice"), Command::Delete { item })?;
        assert!(store.item_detail(item)?.is_none());
        Ok(())
    }
}

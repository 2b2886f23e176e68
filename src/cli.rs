use std::process::ExitCode;

use anyhow::Context as _;

use crate::store::MirrorStore;
use crate::utils::ResultExt as _;
use crate::{Callback, Error, I3Connection, Transport as _, Workspace, WorkspaceMirror};

const USAGE: &str = "Usage: i3-workspaces [list | goto <name>]";

enum Command {
    Watch,
    List,
    Goto(String),
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Command> {
    let cmd = match args.next().as_deref() {
        None | Some("watch") => Command::Watch,
        Some("list") => Command::List,
        Some("goto") => Command::Goto(args.next().context("Missing workspace name")?),
        Some(other) => anyhow::bail!("Unknown command {other:?}"),
    };
    anyhow::ensure!(args.next().is_none(), "Too many arguments");
    Ok(cmd)
}

fn describe(ws: &Workspace) -> String {
    let marker = match (ws.focused, ws.urgent) {
        (_, true) => "!",
        (true, false) => "*",
        (false, false) => " ",
    };
    format!("{marker}{}\t{}", ws.name, ws.output)
}

fn print_change(change: &&'static str, ws: &Workspace) {
    println!("{change}\t{}", describe(ws));
}

pub fn cli_main() -> Option<ExitCode> {
    crate::logging::init_logger();

    let cmd = parse_args(std::env::args().skip(1))
        .context(USAGE)
        .ok_or_log()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the tokio runtime")
        .ok_or_log()?;

    runtime.block_on(run(cmd)).ok_or_log()?;
    Some(ExitCode::SUCCESS)
}

async fn run(cmd: Command) -> anyhow::Result<()> {
    let conn = I3Connection::connect().await.map_err(Error::Connection)?;

    match cmd {
        Command::Goto(name) => crate::goto_name(&conn, &name).await?,
        Command::List => {
            let replies = conn.fetch_workspaces().await.map_err(Error::SnapshotFetch)?;
            for ws in MirrorStore::from_unsorted(replies.iter().map(Workspace::from)).all() {
                println!("{}", describe(ws));
            }
        }
        Command::Watch => {
            let mut mirror = WorkspaceMirror::connect(conn).await?;
            for ws in mirror.workspaces() {
                println!("{}", describe(ws));
            }

            mirror.set_on_created(Callback::from_fn_ctx("created", print_change));
            mirror.set_on_destroyed(Callback::from_fn_ctx("destroyed", print_change));
            mirror.set_on_blurred(Callback::from_fn_ctx("blurred", print_change));
            mirror.set_on_focused(Callback::from_fn_ctx("focused", print_change));
            mirror.set_on_urgent(Callback::from_fn_ctx("urgent", print_change));
            mirror.set_on_connection_lost(|_: &()| println!("disconnected"));

            mirror.run().await;
            log::info!(
                "Stopped with {} workspaces mirrored",
                mirror.workspaces().len()
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(args: &[&str]) -> impl Iterator<Item = String> {
        args.iter().map(|it| it.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn parses_commands() {
        assert!(matches!(parse_args(args(&[])), Ok(Command::Watch)));
        assert!(matches!(parse_args(args(&["list"])), Ok(Command::List)));
        assert!(matches!(
            parse_args(args(&["goto", "2: web"])),
            Ok(Command::Goto(name)) if name == "2: web"
        ));
        assert!(parse_args(args(&["goto"])).is_err());
        assert!(parse_args(args(&["list", "extra"])).is_err());
        assert!(parse_args(args(&["frobnicate"])).is_err());
    }

    #[test]
    fn describes_flags() {
        let mut ws = Workspace {
            name: "3".into(),
            num: Some(3),
            focused: true,
            urgent: false,
            output: "HDMI1".into(),
        };
        assert_eq!(describe(&ws), "*3\tHDMI1");
        ws.urgent = true;
        assert_eq!(describe(&ws), "!3\tHDMI1");
    }
}

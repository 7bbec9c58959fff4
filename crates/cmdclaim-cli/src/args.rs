//! Parseo manual de argumentos: `cmdclaim <subcomando> [--flag valor]...`.
use std::time::Duration;

pub const USAGE: &str = "Uso:
  cmdclaim instance-id
  cmdclaim filter --body <TXT> --from <ID> --to <ID> --cmd <NOMBRE> [--arg <A>]... \
[--message-id <ID>] [--flow-root <RAIZ>] [--dry-run] [--json]
  cmdclaim retention [--plain <SEG>] [--flow <SEG>]
  cmdclaim purge";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterArgs {
    pub body: String,
    pub from: String,
    pub to: String,
    pub command: String,
    pub args: Vec<String>,
    pub message_id: Option<String>,
    pub flow_root: Option<String>,
    pub dry_run: bool,
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    InstanceId,
    Filter(FilterArgs),
    Retention { plain: Option<Duration>, flow: Option<Duration> },
    Purge,
}

pub fn parse(args: &[String]) -> Result<Command, String> {
    let Some(sub) = args.first() else { return Err("falta el subcomando".into()) };
    let rest = &args[1..];
    match sub.as_str() {
        "instance-id" => no_flags(rest).map(|_| Command::InstanceId),
        "purge" => no_flags(rest).map(|_| Command::Purge),
        "filter" => parse_filter(rest).map(Command::Filter),
        "retention" => parse_retention(rest),
        other => Err(format!("subcomando desconocido: {other}")),
    }
}

fn no_flags(rest: &[String]) -> Result<(), String> {
    match rest.first() {
        Some(flag) => Err(format!("argumento inesperado: {flag}")),
        None => Ok(()),
    }
}

fn value<'a>(rest: &'a [String], i: usize, flag: &str) -> Result<&'a String, String> {
    rest.get(i).ok_or_else(|| format!("{flag} requiere un valor"))
}

fn parse_filter(rest: &[String]) -> Result<FilterArgs, String> {
    let (mut body, mut from, mut to, mut command) = (None, None, None, None);
    let mut out = FilterArgs { body: String::new(),
                               from: String::new(),
                               to: String::new(),
                               command: String::new(),
                               args: Vec::new(),
                               message_id: None,
                               flow_root: None,
                               dry_run: false,
                               json: false };
    let mut i = 0;
    while i < rest.len() {
        let flag = rest[i].as_str();
        match flag {
            "--dry-run" => out.dry_run = true,
            "--json" => out.json = true,
            "--body" | "--from" | "--to" | "--cmd" | "--arg" | "--message-id" | "--flow-root" => {
                i += 1;
                let v = value(rest, i, flag)?.clone();
                match flag {
                    "--body" => body = Some(v),
                    "--from" => from = Some(v),
                    "--to" => to = Some(v),
                    "--cmd" => command = Some(v),
                    "--arg" => out.args.push(v),
                    "--message-id" => out.message_id = Some(v),
                    _ => out.flow_root = Some(v),
                }
            }
            other => return Err(format!("argumento inesperado: {other}")),
        }
        i += 1;
    }
    out.body = body.ok_or("falta --body")?;
    out.from = from.ok_or("falta --from")?;
    out.to = to.ok_or("falta --to")?;
    out.command = command.ok_or("falta --cmd")?;
    Ok(out)
}

fn parse_retention(rest: &[String]) -> Result<Command, String> {
    let (mut plain, mut flow) = (None, None);
    let mut i = 0;
    while i < rest.len() {
        let flag = rest[i].as_str();
        let slot = match flag {
            "--plain" => &mut plain,
            "--flow" => &mut flow,
            other => return Err(format!("argumento inesperado: {other}")),
        };
        i += 1;
        let raw = value(rest, i, flag)?;
        let secs = raw.parse::<u64>()
                      .ok()
                      .filter(|s| *s > 0)
                      .ok_or_else(|| format!("{flag} debe ser un entero positivo (got '{raw}')"))?;
        *slot = Some(Duration::from_secs(secs));
        i += 1;
    }
    Ok(Command::Retention { plain, flow })
}

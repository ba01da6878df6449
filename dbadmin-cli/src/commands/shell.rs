///! Interactive shell
///!
///! Holds one instance of every panel and switches between them like tabs.
///! Each panel keeps its own cache, filters and view state for the whole
///! session, so switching back to a tab within the stale time costs no
///! request.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use dbadmin_common::{AuditStatus, BackupType};

use super::{Confirmer, Context};
use crate::api::Transport;
use crate::notify::Notification;
use crate::output;
use crate::panels::{
    AuditLogsPanel, BackupsPanel, DashboardPanel, DatabasePanel, DatabaseView, MigrationsPanel,
    PanelCore, PanelOptions, TenantsPanel,
};
use crate::query::Resource;
use crate::table::TableView;

const HELP: &str = "\
Navigation:  tab <name|1-6>, refresh, next, prev, page <n>, sort <column>, help, quit
Backups:     create [full|incremental|differential] [compressed], delete <id>, download <id>
Migrations:  apply, rollback
Tenants:     suspend <id>, activate <id>
Audit logs:  search <text>, status <value|all>, action <value|all>, clear, export
Database:    search <text>, open <table>, back";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Dashboard,
    Backups,
    Migrations,
    Tenants,
    AuditLogs,
    Database,
}

impl Tab {
    pub const ALL: [Tab; 6] = [
        Tab::Dashboard,
        Tab::Backups,
        Tab::Migrations,
        Tab::Tenants,
        Tab::AuditLogs,
        Tab::Database,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Tab::Dashboard => "dashboard",
            Tab::Backups => "backups",
            Tab::Migrations => "migrations",
            Tab::Tenants => "tenants",
            Tab::AuditLogs => "audit",
            Tab::Database => "database",
        }
    }

    pub fn parse(s: &str) -> Option<Tab> {
        let s = s.trim().to_lowercase();
        if let Ok(n) = s.parse::<usize>() {
            return n.checked_sub(1).and_then(|i| Tab::ALL.get(i).copied());
        }
        match s.as_str() {
            "dashboard" | "overview" | "stats" => Some(Tab::Dashboard),
            "backups" | "backup" => Some(Tab::Backups),
            "migrations" | "migration" => Some(Tab::Migrations),
            "tenants" | "tenant" => Some(Tab::Tenants),
            "audit" | "audit-logs" | "logs" => Some(Tab::AuditLogs),
            "database" | "db" | "tables" => Some(Tab::Database),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Show,
    Tab(Tab),
    Refresh,
    Next,
    Prev,
    Page(usize),
    Sort(String),
    Search(String),
    Status(Option<AuditStatus>),
    Action(Option<String>),
    ClearFilters,
    Create { kind: BackupType, compressed: bool },
    Delete(String),
    Download(String),
    Apply,
    Rollback,
    Suspend(String),
    Activate(String),
    Export,
    Open(String),
    Back,
    Help,
    Quit,
}

impl ShellCommand {
    pub fn parse(line: &str) -> Result<ShellCommand> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(ShellCommand::Show);
        };
        let rest: Vec<&str> = words.collect();
        let arg = |what: &str| -> Result<String> {
            rest.first()
                .map(|s| s.to_string())
                .ok_or_else(|| anyhow!("{} requires {}", head, what))
        };

        let command = match head.to_lowercase().as_str() {
            "tab" | "t" => {
                let name = arg("a tab name")?;
                ShellCommand::Tab(Tab::parse(&name).ok_or_else(|| anyhow!("Unknown tab '{}'", name))?)
            }
            "refresh" | "r" => ShellCommand::Refresh,
            "next" | "n" => ShellCommand::Next,
            "prev" | "p" => ShellCommand::Prev,
            "page" => {
                let page: usize = arg("a page number")?
                    .parse()
                    .map_err(|_| anyhow!("page requires a number"))?;
                ShellCommand::Page(page)
            }
            "sort" => ShellCommand::Sort(arg("a column")?),
            "search" | "/" => ShellCommand::Search(rest.join(" ")),
            "status" => match arg("a status")?.as_str() {
                "all" | "-" => ShellCommand::Status(None),
                value => ShellCommand::Status(Some(value.parse().map_err(|e: String| anyhow!(e))?)),
            },
            "action" => match arg("an action")?.as_str() {
                "all" | "-" => ShellCommand::Action(None),
                value => ShellCommand::Action(Some(value.to_string())),
            },
            "clear" => ShellCommand::ClearFilters,
            "create" => {
                let mut kind = BackupType::Full;
                let mut compressed = false;
                for word in &rest {
                    if matches!(*word, "compressed" | "--compressed" | "-c") {
                        compressed = true;
                    } else {
                        kind = word.parse().map_err(|e: String| anyhow!(e))?;
                    }
                }
                ShellCommand::Create { kind, compressed }
            }
            "delete" | "rm" => ShellCommand::Delete(arg("a backup id")?),
            "download" => ShellCommand::Download(arg("a backup id")?),
            "apply" => ShellCommand::Apply,
            "rollback" => ShellCommand::Rollback,
            "suspend" => ShellCommand::Suspend(arg("a tenant id")?),
            "activate" => ShellCommand::Activate(arg("a tenant id")?),
            "export" => ShellCommand::Export,
            "open" | "select" => ShellCommand::Open(arg("a table name")?),
            "back" | "b" => ShellCommand::Back,
            "help" | "h" | "?" => ShellCommand::Help,
            "quit" | "exit" | "q" => ShellCommand::Quit,
            other => match Tab::parse(other) {
                Some(tab) => ShellCommand::Tab(tab),
                None => bail!("Unknown command '{}', type 'help'", other),
            },
        };
        Ok(command)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Paging and sorting, whatever the row type
trait TableControls {
    fn next(&mut self) -> bool;
    fn prev(&mut self) -> bool;
    fn goto(&mut self, page: usize);
    fn sort(&mut self, column: &str) -> bool;
}

impl<R> TableControls for TableView<R> {
    fn next(&mut self) -> bool {
        self.next_page()
    }

    fn prev(&mut self) -> bool {
        self.prev_page()
    }

    fn goto(&mut self, page: usize) {
        self.set_page(page);
    }

    fn sort(&mut self, column: &str) -> bool {
        self.toggle_sort(column)
    }
}

pub struct Shell {
    active: Tab,
    dashboard: DashboardPanel,
    backups: BackupsPanel,
    migrations: MigrationsPanel,
    tenants: TenantsPanel,
    audit: AuditLogsPanel,
    database: DatabasePanel,
    download_dir: PathBuf,
}

impl Shell {
    pub fn new(transport: Arc<dyn Transport>, options: &PanelOptions, download_dir: PathBuf) -> Self {
        Self {
            active: Tab::Dashboard,
            dashboard: DashboardPanel::new(transport.clone(), options),
            backups: BackupsPanel::new(transport.clone(), options),
            migrations: MigrationsPanel::new(transport.clone(), options),
            tenants: TenantsPanel::new(transport.clone(), options),
            audit: AuditLogsPanel::new(transport.clone(), options),
            database: DatabasePanel::new(transport, options),
            download_dir,
        }
    }

    pub fn active(&self) -> Tab {
        self.active
    }

    fn core(&mut self) -> &mut PanelCore {
        match self.active {
            Tab::Dashboard => &mut self.dashboard.core,
            Tab::Backups => &mut self.backups.core,
            Tab::Migrations => &mut self.migrations.core,
            Tab::Tenants => &mut self.tenants.core,
            Tab::AuditLogs => &mut self.audit.core,
            Tab::Database => &mut self.database.core,
        }
    }

    fn table(&mut self, command: &str) -> Result<&mut dyn TableControls> {
        match self.active {
            Tab::Dashboard => Err(self.wrong_tab(command)),
            Tab::Backups => Ok(&mut self.backups.table),
            Tab::Migrations => Ok(&mut self.migrations.table),
            Tab::Tenants => Ok(&mut self.tenants.table),
            Tab::AuditLogs => Ok(&mut self.audit.table),
            Tab::Database => {
                if *self.database.view() == DatabaseView::TableList {
                    Ok(&mut self.database.catalog)
                } else {
                    Ok(&mut self.database.rows)
                }
            }
        }
    }

    /// Notifications raised by the active panel since the last call
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.core().notifications.drain()
    }

    /// Load the active panel; served from its cache while still fresh
    pub async fn load(&mut self) {
        match self.active {
            Tab::Dashboard => {
                self.dashboard.refresh().await;
            }
            Tab::Backups => {
                self.backups.refresh().await;
            }
            Tab::Migrations => {
                self.migrations.refresh().await;
            }
            Tab::Tenants => {
                self.tenants.refresh().await;
            }
            Tab::AuditLogs => {
                self.audit.refresh().await;
            }
            Tab::Database => {
                self.database.refresh().await;
            }
        }
    }

    fn resources(&self) -> &'static [Resource] {
        match self.active {
            Tab::Dashboard => &[Resource::SystemStats],
            Tab::Backups => &[Resource::Backups],
            Tab::Migrations => &[Resource::Migrations],
            Tab::Tenants => &[Resource::Tenants],
            Tab::AuditLogs => &[Resource::AuditLogs, Resource::AuditStats],
            Tab::Database => &[Resource::DatabaseTables, Resource::TableData],
        }
    }

    fn wrong_tab(&self, command: &str) -> anyhow::Error {
        anyhow!("'{}' is not available on the {} tab", command, self.active.name())
    }

    /// Ask before dispatching whatever the active panel's gate holds
    async fn confirm_pending(&mut self, prompt: String, confirmer: &dyn Confirmer) -> Result<()> {
        let accepted = confirmer.confirm(&prompt)?;
        match (self.active, accepted) {
            (Tab::Backups, true) => {
                self.backups.confirm().await;
            }
            (Tab::Backups, false) => self.backups.cancel(),
            (Tab::Migrations, true) => {
                self.migrations.confirm().await;
            }
            (Tab::Migrations, false) => self.migrations.cancel(),
            (Tab::Tenants, true) => {
                self.tenants.confirm().await;
            }
            (Tab::Tenants, false) => self.tenants.cancel(),
            _ => {}
        }
        if !accepted {
            self.core().notifications.info("Cancelled");
        }
        Ok(())
    }

    pub async fn execute(&mut self, command: ShellCommand, confirmer: &dyn Confirmer) -> Result<Flow> {
        let apply = command == ShellCommand::Apply;
        match command {
            ShellCommand::Show => {}
            ShellCommand::Quit => return Ok(Flow::Quit),
            ShellCommand::Help => println!("{}", HELP),
            ShellCommand::Tab(tab) => {
                self.active = tab;
                self.load().await;
            }
            ShellCommand::Refresh => {
                for resource in self.resources() {
                    self.core().cache().invalidate(*resource);
                }
                if let DatabaseView::Table { name } = self.database.view().clone() {
                    if self.active == Tab::Database {
                        self.database.open_table(&name).await;
                        return Ok(Flow::Continue);
                    }
                }
                self.load().await;
            }
            ShellCommand::Next => {
                self.table("next")?.next();
            }
            ShellCommand::Prev => {
                self.table("prev")?.prev();
            }
            ShellCommand::Page(page) => {
                self.table("page")?.goto(page.saturating_sub(1));
            }
            ShellCommand::Sort(column) => {
                if !self.table("sort")?.sort(&column) {
                    bail!("No column '{}'", column);
                }
            }
            ShellCommand::Search(text) => match self.active {
                Tab::AuditLogs => {
                    self.audit.set_search(text);
                    self.audit.refresh().await;
                }
                Tab::Database => self.database.set_search(text),
                _ => return Err(self.wrong_tab("search")),
            },
            ShellCommand::Status(status) if self.active == Tab::AuditLogs => {
                self.audit.set_status(status);
                self.audit.refresh().await;
            }
            ShellCommand::Action(action) if self.active == Tab::AuditLogs => {
                self.audit.set_action(action);
                self.audit.refresh().await;
            }
            ShellCommand::ClearFilters if self.active == Tab::AuditLogs => {
                self.audit.clear_filters();
                self.audit.refresh().await;
            }
            ShellCommand::Export if self.active == Tab::AuditLogs => {
                let dir = self.download_dir.clone();
                self.audit.export(&dir, Utc::now()).await;
            }
            ShellCommand::Create { kind, compressed } if self.active == Tab::Backups => {
                self.backups.create(kind, compressed).await;
            }
            ShellCommand::Delete(id) if self.active == Tab::Backups => {
                self.backups.request_delete(&id);
                self.confirm_pending(format!("Delete backup {}? This cannot be undone", id), confirmer)
                    .await?;
            }
            ShellCommand::Download(id) if self.active == Tab::Backups => {
                let dir = self.download_dir.clone();
                self.backups.download(&id, &dir).await;
            }
            ShellCommand::Apply | ShellCommand::Rollback if self.active == Tab::Migrations => {
                let requested = if apply {
                    self.migrations.request_apply()
                } else {
                    self.migrations.request_rollback()
                };
                if let Some(prompt) = self.migrations.confirmation_message().filter(|_| requested) {
                    self.confirm_pending(prompt, confirmer).await?;
                }
            }
            ShellCommand::Suspend(id) if self.active == Tab::Tenants => {
                if self.tenants.request_suspend(&id) {
                    self.confirm_pending(format!("Suspend tenant {}?", id), confirmer).await?;
                }
            }
            ShellCommand::Activate(id) if self.active == Tab::Tenants => {
                self.tenants.activate(&id).await;
            }
            ShellCommand::Open(name) if self.active == Tab::Database => {
                self.database.open_table(&name).await;
            }
            ShellCommand::Back if self.active == Tab::Database => self.database.deselect(),
            other => {
                let name = format!("{:?}", other).to_lowercase();
                let name = name.split(['(', ' ', '{']).next().unwrap_or("").to_string();
                return Err(self.wrong_tab(&name));
            }
        }
        Ok(Flow::Continue)
    }

    pub fn render(&self) -> String {
        let tabs: Vec<String> = Tab::ALL
            .iter()
            .enumerate()
            .map(|(i, tab)| {
                if *tab == self.active {
                    format!("[{} {}]", i + 1, tab.name())
                } else {
                    format!(" {} {} ", i + 1, tab.name())
                }
            })
            .collect();

        let body = match self.active {
            Tab::Dashboard => self.dashboard.render(),
            Tab::Backups => self.backups.render(),
            Tab::Migrations => self.migrations.render(),
            Tab::Tenants => self.tenants.render(),
            Tab::AuditLogs => self.audit.render(),
            Tab::Database => self.database.render(),
        };

        format!("{}\n\n{}", tabs.join(" "), body)
    }
}

pub async fn run_shell(ctx: &Context, download_dir: PathBuf) -> Result<()> {
    use dialoguer::Input;

    let mut shell = Shell::new(ctx.transport.clone(), &ctx.options, download_dir);
    shell.load().await;

    loop {
        output::print_notifications(shell.take_notifications());
        println!("{}\n", shell.render());

        let line: String = Input::new()
            .with_prompt(format!("dbadmin:{}", shell.active().name()))
            .allow_empty(true)
            .interact_text()?;

        let result = match ShellCommand::parse(&line) {
            Ok(command) => shell.execute(command, &*ctx.confirmer).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(e) => output::print_error(&e.to_string()),
        }
    }

    Ok(())
}

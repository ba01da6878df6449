use anyhow::Result;
use clap::Subcommand;

use super::{finish, spinner, Context};
use crate::output::{self, print_view};
use crate::panels::TenantsPanel;

#[derive(Subcommand, Debug, Clone)]
pub enum TenantCommands {
    /// List tenants
    List,
    /// Suspend an active tenant
    Suspend { id: String },
    /// Re-activate a tenant
    Activate { id: String },
}

pub async fn handle_tenant_command(command: TenantCommands, ctx: &Context) -> Result<()> {
    let mut panel = TenantsPanel::new(ctx.transport.clone(), &ctx.options);

    let loading = spinner("Loading tenants...");
    let loaded = panel.refresh().await;
    loading.finish_and_clear();

    match command {
        TenantCommands::List => {
            if loaded {
                print_view(&panel.render(), panel.rows(), ctx.format)?;
            }
        }
        TenantCommands::Suspend { id } => {
            if panel.request_suspend(&id) {
                let name = panel.tenant(&id).map(|t| t.name.clone()).unwrap_or_else(|| id.clone());
                let prompt = format!("Suspend tenant '{}'? Its users will lose access", name);
                if ctx.confirmer.confirm(&prompt)? {
                    panel.confirm().await;
                } else {
                    panel.cancel();
                    output::print_info("Suspension cancelled");
                }
            }
        }
        TenantCommands::Activate { id } => {
            panel.activate(&id).await;
        }
    }

    finish(&mut panel.core)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use crate::testing::FakeBackend;

    #[tokio::test]
    async fn test_suspend_prompts_with_tenant_name() {
        let backend = FakeBackend::new();
        let (ctx, scripted) = context(&backend, vec![true]);

        handle_tenant_command(TenantCommands::Suspend { id: "t2".to_string() }, &ctx)
            .await
            .unwrap();

        assert!(scripted.prompts.borrow()[0].contains("Globex"));
        assert_eq!(backend.request_count("/tenants/t2/suspend"), 1);
    }

    #[tokio::test]
    async fn test_suspend_of_suspended_tenant_never_prompts() {
        let backend = FakeBackend::new();
        let (ctx, scripted) = context(&backend, vec![true]);

        handle_tenant_command(TenantCommands::Suspend { id: "t3".to_string() }, &ctx)
            .await
            .unwrap();

        assert!(scripted.prompts.borrow().is_empty());
        assert_eq!(backend.request_count("/tenants/t3/suspend"), 0);
    }

    #[tokio::test]
    async fn test_activate_unknown_tenant_fails() {
        let backend = FakeBackend::new();
        let (ctx, _) = context(&backend, vec![]);

        let result =
            handle_tenant_command(TenantCommands::Activate { id: "nope".to_string() }, &ctx).await;
        assert!(result.is_err());
    }
}

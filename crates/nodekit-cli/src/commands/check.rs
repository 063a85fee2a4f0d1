//! Verify that earlier installer steps left everything the deploy needs

use clap::Args;
use color_eyre::eyre::Result;
use console::style;
use nodekit_core::state::CLIENT_CONTRACT_ADDRESS;
use nodekit_core::InstallerState;

use crate::config::ConfigArgs;

/// Check installer prerequisites without deploying anything
#[derive(Args)]
pub struct CheckCommand {
    #[command(flatten)]
    pub target: ConfigArgs,
}

impl CheckCommand {
    pub async fn run(self) -> Result<()> {
        let (config, env) = self.target.load()?;
        let state = InstallerState::load(&env, &config.deploy.required_api_keys)?;
        let settings = config.resolve(state.values(), None, None)?;

        println!(
            "{} Installer state in {}",
            style("*").green(),
            style(env.path().display()).cyan()
        );
        println!("   Install dir:       {}", state.install_dir.display());
        println!("   Operator address:  {}", style(&state.operator_address).yellow());
        println!("   Job ID:            {}", state.job_id);
        println!("   Job ID (compact):  {}", state.job_id_no_hyphens);
        for key in state.api_keys.keys() {
            println!("   {:<18} {}", format!("{}:", key), style("set").green());
        }
        println!(
            "   Private key:       {}",
            if state.private_key.is_some() {
                style("set").green()
            } else {
                style("will be prompted").yellow()
            }
        );

        let source_status = if settings.contract_dir.is_dir() {
            style("found").green()
        } else {
            style("missing").red()
        };
        println!(
            "   Contract source:   {} ({})",
            settings.contract_dir.display(),
            source_status
        );

        if state.job_id.is_placeholder() {
            println!();
            println!(
                "{} Job ID is a placeholder; deploy will ask for confirmation",
                style("!").yellow()
            );
        }

        if let Some(address) = state.get(CLIENT_CONTRACT_ADDRESS) {
            println!();
            println!(
                "   Client contract already deployed at {}",
                style(address).yellow()
            );
        }

        Ok(())
    }
}

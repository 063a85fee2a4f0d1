//! Deploy the client contract against the node's operator contract

use std::path::PathBuf;

use clap::Args;
use color_eyre::eyre::{eyre, Result};
use console::style;
use nodekit_core::state::{CLIENT_CONTRACT_ADDRESS, PRIVATE_KEY};
use nodekit_core::{
    is_valid_address, is_valid_private_key, signer_address, substitute_template_value,
    AddressExtractor, DeploymentSummary, EnvFile, Error, InstallerState, StagedProject,
};
use tracing::info;

use crate::config::{ConfigArgs, DeploySettings};
use crate::prompt::{AssumeYes, Prompter, TerminalPrompter};
use crate::toolchain::{ProcessRunner, ToolInvocation, ToolRunner};

/// Deploy the client contract and record its address for later steps
#[derive(Args, Debug, Clone, Default)]
pub struct DeployCommand {
    #[command(flatten)]
    pub target: ConfigArgs,

    /// Network name passed to the migration tool
    #[arg(long)]
    pub network: Option<String>,

    /// Contract project to deploy (overrides nodekit.toml)
    #[arg(long)]
    pub contract_dir: Option<PathBuf>,

    /// Accept every confirmation and never prompt for input
    #[arg(short, long)]
    pub yes: bool,

    /// Keep the staging directory for inspection
    #[arg(long)]
    pub keep_staging: bool,
}

/// How a deploy run ended without an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Deployed { address: String },
    /// The operator declined a confirmation
    Declined,
    /// Deployed, but no address could be recovered or entered
    AddressUnknown,
}

impl DeployCommand {
    pub async fn run(self) -> Result<()> {
        let prompter: Box<dyn Prompter> = if self.yes {
            Box::new(AssumeYes)
        } else {
            Box::new(TerminalPrompter)
        };

        self.execute(prompter.as_ref(), &ProcessRunner).await?;
        Ok(())
    }

    pub async fn execute(
        &self,
        prompter: &dyn Prompter,
        runner: &dyn ToolRunner,
    ) -> Result<Outcome> {
        // 1. Prerequisites
        let (config, env) = self.target.load()?;
        println!(
            "{} Checking installer state in {}...",
            style("->").blue(),
            style(env.path().display()).cyan()
        );
        let mut state = InstallerState::load(&env, &config.deploy.required_api_keys)?;
        let settings = config.resolve(
            state.values(),
            self.network.as_deref(),
            self.contract_dir.as_deref(),
        )?;
        println!(
            "   Operator: {}  Job: {}",
            style(&state.operator_address).yellow(),
            style(&state.job_id).yellow()
        );

        // 2. Placeholder job id gate
        if state.job_id.is_placeholder() {
            println!(
                "{} Job ID '{}' is a placeholder. The contract will send requests no job answers.",
                style("!").yellow(),
                state.job_id
            );
            if !prompter.confirm("Continue with the placeholder job ID?", false)? {
                println!("Run the job creation step, then deploy again.");
                return Ok(Outcome::Declined);
            }
        }

        // 3. Deployer key
        let private_key = match state.private_key.clone() {
            Some(key) => key,
            None => match collect_private_key(&env, &mut state, prompter)? {
                Some(key) => key,
                None => {
                    println!(
                        "Add one with {} and deploy again.",
                        style(format!("nodekit set-key {} <key>", PRIVATE_KEY)).cyan()
                    );
                    return Ok(Outcome::Declined);
                }
            },
        };
        let deployer = format!("{:?}", signer_address(&private_key)?);
        println!("   Deployer: {}", style(&deployer).yellow());

        // 4. Stage and patch
        let staged = StagedProject::stage(&settings.contract_dir)?;
        let migration = staged.join(&settings.migration_file);
        if !migration.is_file() {
            return Err(eyre!(
                "Migration script {} not found in {}",
                settings.migration_file.display(),
                settings.contract_dir.display()
            ));
        }

        substitute_template_value(&migration, &settings.oracle_placeholder, &state.operator_address)?;
        substitute_template_value(&migration, &settings.job_placeholder, &state.job_id_no_hyphens)?;
        println!(
            "{} Patched {} with operator address and job ID",
            style("*").green(),
            settings.migration_file.display()
        );

        // 5. Install and migrate
        let prompt = format!(
            "Deploy {} to network '{}'?",
            settings.contract_name, settings.network
        );
        if !prompter.confirm(&prompt, true)? {
            println!("Deployment cancelled.");
            return Ok(Outcome::Declined);
        }

        run_tools(&settings, &staged, &state, runner).await?;

        // 6. Recover the address
        let extractor = AddressExtractor::standard(staged.path());
        let address = match extractor.extract_with_tier(&settings.contract_name) {
            Some((tier, address)) => {
                info!(tier, "recovered contract address");
                Some(address)
            }
            None => ask_for_address(prompter)?,
        };

        if self.keep_staging {
            let kept = staged.keep();
            println!(
                "   Staging directory kept at {}",
                style(kept.display()).dim()
            );
        }

        let Some(address) = address else {
            println!(
                "{} Nothing was saved. Once you know the address, run {}",
                style("!").yellow(),
                style(format!(
                    "nodekit set-key {} <address>",
                    CLIENT_CONTRACT_ADDRESS
                ))
                .cyan()
            );
            return Ok(Outcome::AddressUnknown);
        };

        // 7. Persist
        env.set_or_append(CLIENT_CONTRACT_ADDRESS, &address)?;
        env.restrict_permissions()?;

        let summary = DeploymentSummary {
            contract_name: settings.contract_name.clone(),
            network: settings.network.clone(),
            contract_address: address.clone(),
            operator_address: state.operator_address.clone(),
            job_id: state.job_id.to_string(),
            job_id_no_hyphens: state.job_id_no_hyphens.clone(),
            deployer: Some(deployer),
        };
        summary.write(&settings.summary_file)?;

        println!();
        println!(
            "{} {} deployed at {}",
            style("*").green().bold(),
            style(&settings.contract_name).cyan(),
            style(&address).yellow()
        );
        println!(
            "   Saved {} to {}",
            CLIENT_CONTRACT_ADDRESS,
            env.path().display()
        );
        println!(
            "   Summary and next steps: {}",
            style(settings.summary_file.display()).cyan()
        );

        Ok(Outcome::Deployed { address })
    }
}

/// Ask for a deployer key and persist it. `None` if the operator declines.
fn collect_private_key(
    env: &EnvFile,
    state: &mut InstallerState,
    prompter: &dyn Prompter,
) -> Result<Option<String>> {
    if !prompter.is_interactive() {
        return Err(Error::missing(
            PRIVATE_KEY,
            format!(
                "Add it with `nodekit set-key {} <key>` or run without --yes.",
                PRIVATE_KEY
            ),
        )
        .into());
    }

    println!(
        "{} No {} found in {}",
        style("!").yellow(),
        PRIVATE_KEY,
        env.path().display()
    );
    if !prompter.confirm("Enter the deployer private key now?", true)? {
        return Ok(None);
    }

    let key = prompter.secret("Private key (64 hex characters, no 0x prefix)")?;
    let key = key.trim().to_string();
    if !is_valid_private_key(&key) {
        return Err(Error::Validation(
            "private key must be exactly 64 hex characters without a 0x prefix".into(),
        )
        .into());
    }

    env.set_or_append(PRIVATE_KEY, &key)?;
    env.restrict_permissions()?;
    state.set_private_key(key.clone());
    println!(
        "{} Saved {} to {}",
        style("*").green(),
        PRIVATE_KEY,
        env.path().display()
    );

    Ok(Some(key))
}

async fn run_tools(
    settings: &DeploySettings,
    staged: &StagedProject,
    state: &InstallerState,
    runner: &dyn ToolRunner,
) -> Result<()> {
    let install = ToolInvocation::from_command(&settings.install_command, staged.path())?;
    println!(
        "{} Installing dependencies ({})...",
        style("->").blue(),
        install.command_line()
    );
    runner.run(&install).await?.ensure_success(&install)?;

    let migrate = ToolInvocation::from_command(&settings.migrate_command, staged.path())?
        .with_env(state.values().clone())
        .streaming();
    println!(
        "{} Running migrations on {}...",
        style("->").blue(),
        style(&settings.network).cyan()
    );
    let output = runner.run(&migrate).await?;

    let log_path = staged.join(nodekit_core::extract::DEPLOY_LOG);
    std::fs::write(&log_path, output.combined())?;
    output.ensure_success(&migrate)?;

    Ok(())
}

/// Last resort when no tier found the address
fn ask_for_address(prompter: &dyn Prompter) -> Result<Option<String>> {
    println!(
        "{} Could not determine the deployed address automatically",
        style("!").yellow()
    );

    let answer = prompter.input("Deployed contract address (leave empty to skip)")?;
    let answer = answer.trim();
    if answer.is_empty() {
        return Ok(None);
    }

    if !is_valid_address(answer) {
        println!(
            "{} '{}' is not a valid address (expected 0x followed by 40 hex characters)",
            style("!").yellow(),
            answer
        );
        return Ok(None);
    }

    Ok(Some(answer.to_string()))
}

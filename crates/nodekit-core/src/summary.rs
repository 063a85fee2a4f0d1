//! Human-readable record of a client contract deployment

use std::fmt;
use std::path::Path;

use crate::error::Result;

/// Details written to the summary file after a successful deployment
#[derive(Debug, Clone)]
pub struct DeploymentSummary {
    pub contract_name: String,
    pub network: String,
    pub contract_address: String,
    pub operator_address: String,
    pub job_id: String,
    pub job_id_no_hyphens: String,
    pub deployer: Option<String>,
}

impl fmt::Display for DeploymentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = format!("{} Contract Deployment", self.contract_name);

        writeln!(f, "{}", title)?;
        writeln!(f, "{}", "=".repeat(title.len()))?;
        writeln!(f)?;
        writeln!(f, "Network:              {}", self.network)?;
        writeln!(f, "Contract address:     {}", self.contract_address)?;
        writeln!(f, "Operator address:     {}", self.operator_address)?;
        writeln!(f, "Job ID:               {}", self.job_id)?;
        writeln!(f, "Job ID (no hyphens):  {}", self.job_id_no_hyphens)?;
        if let Some(deployer) = &self.deployer {
            writeln!(f, "Deployer:             {}", deployer)?;
        }
        writeln!(f)?;
        writeln!(f, "Next steps")?;
        writeln!(f, "----------")?;
        writeln!(
            f,
            "1. Fund the client contract with LINK so it can pay for oracle requests:"
        )?;
        writeln!(f, "     send LINK to {}", self.contract_address)?;
        writeln!(
            f,
            "2. Make sure the job {} is active on the node and points at the",
            self.job_id
        )?;
        writeln!(f, "   operator contract {}.", self.operator_address)?;
        writeln!(f, "3. Send a test request from the client contract:")?;
        writeln!(f, "     npx truffle console --network {}", self.network)?;
        writeln!(
            f,
            "     > const client = await {}.at(\"{}\")",
            self.contract_name, self.contract_address
        )?;
        writeln!(f, "     > await client.requestData()")?;
        writeln!(
            f,
            "4. Watch the job run in the node operator UI and check the fulfilled value."
        )
    }
}

impl DeploymentSummary {
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Write the rendered summary to `path`, creating parent directories
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.render())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> DeploymentSummary {
        DeploymentSummary {
            contract_name: "Client".to_string(),
            network: "testnet".to_string(),
            contract_address: "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_string(),
            operator_address: "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb".to_string(),
            job_id: "abcdef12-3456-7890-1234-567890123456".to_string(),
            job_id_no_hyphens: "abcdef12345678901234567890123456".to_string(),
            deployer: None,
        }
    }

    #[test]
    fn test_render_contains_details() {
        let text = summary().render();

        assert!(text.starts_with("Client Contract Deployment\n"));
        assert!(text.contains("Contract address:     0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"));
        assert!(text.contains("Operator address:     0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"));
        assert!(text.contains("abcdef12345678901234567890123456"));
        assert!(text.contains("npx truffle console --network testnet"));
        assert!(!text.contains("Deployer:"));
    }

    #[test]
    fn test_render_with_deployer() {
        let mut summary = summary();
        summary.deployer = Some("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".to_string());

        assert!(summary
            .render()
            .contains("Deployer:             0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"));
    }

    #[test]
    fn test_write_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("info/client_contract_info.txt");

        summary().write(&path).unwrap();

        assert_eq!(std::fs::read_to_string(path).unwrap(), summary().render());
    }
}

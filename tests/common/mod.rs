//! Shared test infrastructure for integration tests.
//!
//! Builds a throwaway workflow root with `sh` stand-ins for the step
//! scripts, then drives the compiled `oppflow` binary against it.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Workflow fixture rooted in a temp dir.
pub struct WorkflowFixture {
    pub root: TempDir,
}

impl Default for WorkflowFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowFixture {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create fixture root");
        fs::create_dir_all(root.path().join("scripts")).expect("create scripts dir");
        let fixture = Self { root };
        fixture.write_config();
        fixture
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.path().join("scripts")
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("workflow.json")
    }

    pub fn state_path(&self) -> PathBuf {
        self.path().join("shared_env.json")
    }

    /// Write a step script; scripts run via `sh` from the scripts dir.
    pub fn write_script(&self, name: &str, body: &str) {
        fs::write(self.scripts_dir().join(name), body).expect("write script");
    }

    /// Read the shared state file as a JSON object.
    pub fn state(&self) -> serde_json::Value {
        let bytes = fs::read(self.state_path()).expect("read state file");
        serde_json::from_slice(&bytes).expect("parse state file")
    }

    /// Run `oppflow` with the given arguments inside the fixture root.
    pub fn run_oppflow(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_oppflow"))
            .args(args)
            .current_dir(self.path())
            .output()
            .expect("run oppflow binary")
    }

    fn write_config(&self) {
        let config = serde_json::json!({
            "scripts_dir": self.scripts_dir(),
            "state_file": self.state_path(),
            "log_dir": self.path().join("logs"),
            "interpreter": "sh",
            "poll_interval_secs": 0,
            "poll_max_attempts": 5,
            "scripts": {
                "create_product": "create_product.sh",
                "describe_product_changeset": "describe_product.sh",
                "create_offer": "create_offer.sh",
                "describe_offer_changeset": "describe_offer_changeset.sh",
                "describe_offer": "describe_offer.sh",
                "create_opportunity": "create_opportunity.sh",
                "list_solutions": "list_solutions.sh",
                "associate_opportunity": "associate_opportunity.sh",
                "start_engagement": "start_engagement.sh",
                "simulate_approval": "simulate_approval.sh",
                "associate_offer": "associate_offer.sh",
                "get_opportunity": "get_opportunity.sh",
                "search_agreements": "search_agreements.sh",
                "update_opportunity": "update_opportunity.sh"
            }
        });
        let text = serde_json::to_string_pretty(&config).expect("serialize fixture config");
        fs::write(self.config_path(), text).expect("write fixture config");
    }
}

/// Install the full happy-path script set.
pub fn install_happy_path_scripts(fixture: &WorkflowFixture) {
    fixture.write_script("create_product.sh", "echo \"ChangeSet ID: cs-product-1\"\n");
    fixture.write_script(
        "describe_product.sh",
        "echo \"ChangeSet ID: $1\"\necho \"Status: SUCCEEDED\"\necho \"Product ID: prod-abc123\"\n",
    );
    fixture.write_script("create_offer.sh", "echo \"ChangeSet ID: cs-priv-1\"\n");
    fixture.write_script(
        "describe_offer_changeset.sh",
        "echo \"ChangeSet ID: $1\"\necho \"Status: SUCCEEDED\"\necho \"Offer ID: offer-7f3a9\"\n",
    );
    fixture.write_script(
        "describe_offer.sh",
        "echo '\"EntityArn\": \"arn:aws:aws-marketplace:us-east-1:123456789012:AWSMarketplace/Offer/offer-7f3a9\"'\n",
    );
    fixture.write_script("create_opportunity.sh", "echo '\"Id\": \"O1234567\"'\n");
    fixture.write_script(
        "list_solutions.sh",
        "echo \"Set SOLUTION_ID environment variable to: S-0059717\"\n",
    );
    fixture.write_script("associate_opportunity.sh", "echo associated\n");
    fixture.write_script("start_engagement.sh", "echo engagement started\n");
    fixture.write_script("simulate_approval.sh", "echo approved\n");
    fixture.write_script("associate_offer.sh", "echo offer associated\n");
    fixture.write_script("get_opportunity.sh", "echo '\"Id\": \"O1234567\"'\n");
    fixture.write_script(
        "search_agreements.sh",
        "echo \"searching for $1\"\necho '\"Status\": \"ACTIVE\"'\n",
    );
    fixture.write_script("update_opportunity.sh", "echo updated to Committed\n");
}

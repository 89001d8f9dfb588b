//! Integration testing for the CLI

#[cfg(test)]
mod integration {
    use assert_cli;
    use tempfile::TempDir;

    #[test]
    fn call_without_args() {
        assert_cli::Assert::main_binary()
            .fails()
            .and()
            .stderr()
            .contains("error: The following required arguments were not provided:")
            .unwrap();
    }

    #[test]
    fn no_store_root() {
        assert_cli::Assert::main_binary()
            .with_args(&["--store-root", "test_data/no_store"])
            .fails()
            .and()
            .stderr()
            .contains("Could not find store root test_data/no_store")
            .unwrap();
    }

    #[test]
    fn config_store_root() {
        assert_cli::Assert::main_binary()
            .with_args(&["--config", "test_data/config/status.json"])
            .fails()
            .and()
            .stderr()
            .contains("Could not find store root /storage/IN")
            .unwrap();
    }

    #[test]
    fn bad_platform() {
        assert_cli::Assert::main_binary()
            .with_args(&["--store-root", "test_data/store"])
            .with_args(&["--platforms", "NovaSeq,HiSeq"])
            .fails()
            .and()
            .stderr()
            .contains("Error parsing platforms: unknown platform 'HiSeq'")
            .unwrap();
    }

    #[test]
    fn initializing_run() {
        assert_cli::Assert::main_binary()
            .with_args(&["--store-root", "test_data/store"])
            .succeeds()
            .and()
            .stdout()
            .contains(r#"{"NovaSeq_A":{"paired_end":"Run is initializing""#)
            .and()
            .stdout()
            .contains(r#""status":"Initializing""#)
            .unwrap();
    }

    #[test]
    fn filtered_out() {
        assert_cli::Assert::main_binary()
            .with_args(&["--store-root", "test_data/store"])
            .with_args(&["--platforms", "MiSeq"])
            .succeeds()
            .and()
            .stdout()
            .contains("{}")
            .unwrap();
    }

    #[test]
    fn output_file() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("status.json");

        assert_cli::Assert::main_binary()
            .with_args(&["--store-root", "test_data/store"])
            .with_args(&["--output", output.to_str().unwrap(), "--pretty"])
            .succeeds()
            .unwrap();

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(report["NovaSeq_A"]["status"], "Initializing");
        assert_eq!(report["NovaSeq_A"]["q30_plot"]["options"]["value"]["scale"], "interop");
        assert!(report.get("NovaSeq_B").is_none());
    }
}

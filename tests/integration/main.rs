//! Integration tests for Placeboard

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    /// Binary isolated from the user's config, state and API
    fn placeboard(home: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("placeboard");
        cmd.env("PLACEBOARD_CONFIG", home.path().join("config.toml"))
            .env("PLACEBOARD_STATE_DIR", home.path().join("state"))
            .env("PLACEBOARD_API_URL", "http://127.0.0.1:9/api")
            .env_remove("PLACEBOARD_PASSWORD");
        cmd
    }

    #[test]
    fn help_displays() {
        let home = TempDir::new().unwrap();
        placeboard(&home)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("admin client for the places directory"));
    }

    #[test]
    fn version_displays() {
        let home = TempDir::new().unwrap();
        placeboard(&home)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("placeboard"));
    }

    #[test]
    fn config_path_follows_flag() {
        let home = TempDir::new().unwrap();
        placeboard(&home)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_defaults() {
        let home = TempDir::new().unwrap();
        placeboard(&home)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[api]"))
            .stdout(predicate::str::contains("max_images = 2"));
    }

    #[test]
    fn config_init_then_set() {
        let home = TempDir::new().unwrap();
        placeboard(&home)
            .args(["config", "init"])
            .assert()
            .success();
        assert!(home.path().join("config.toml").exists());

        placeboard(&home)
            .args(["config", "set", "api.base_url", "https://places.example/api"])
            .assert()
            .success();

        placeboard(&home)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("https://places.example/api"));
    }

    #[test]
    fn config_set_unknown_key_fails() {
        let home = TempDir::new().unwrap();
        placeboard(&home)
            .args(["config", "set", "vm.name", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn broken_config_reports_path_and_hint() {
        let home = TempDir::new().unwrap();
        std::fs::write(home.path().join("config.toml"), "[api\n").unwrap();
        placeboard(&home)
            .args(["stats"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"))
            .stderr(predicate::str::contains("config init --force"));
    }

    #[test]
    fn whoami_logged_out() {
        let home = TempDir::new().unwrap();
        placeboard(&home)
            .arg("whoami")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Not logged in"))
            .stderr(predicate::str::contains("placeboard login"));
    }

    #[test]
    fn logout_without_session_succeeds() {
        let home = TempDir::new().unwrap();
        placeboard(&home)
            .arg("logout")
            .assert()
            .success()
            .stdout(predicate::str::contains("No stored session"));
    }

    #[test]
    fn login_without_password_outside_terminal() {
        let home = TempDir::new().unwrap();
        placeboard(&home)
            .args(["login", "--email", "amel@example.com"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--password"));
    }

    #[test]
    fn login_validates_before_network() {
        let home = TempDir::new().unwrap();
        placeboard(&home)
            .args(["login", "--email", "amel", "--password", "hunter22"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid email"));
    }

    #[test]
    fn create_rejects_bad_wilaya_before_upload() {
        let home = TempDir::new().unwrap();
        let image = home.path().join("casbah.jpg");
        std::fs::write(&image, b"\xFF\xD8\xFF").unwrap();

        placeboard(&home)
            .args(["places", "create", "--name", "Casbah", "--wilaya", "99", "--image"])
            .arg(&image)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid wilaya code"));
    }

    #[test]
    fn create_requires_an_image() {
        let home = TempDir::new().unwrap();
        placeboard(&home)
            .args(["places", "create", "--name", "Casbah", "--wilaya", "16"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("at least one file"));
    }

    #[test]
    fn delete_without_yes_outside_terminal_keeps_place() {
        let home = TempDir::new().unwrap();
        placeboard(&home)
            .args(["places", "delete", "7"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing deleted"));
    }

    #[test]
    fn completions_generate() {
        let home = TempDir::new().unwrap();
        placeboard(&home)
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("placeboard"));
    }
}

//! Tests for configuration loading and validation

#[cfg(test)]
mod tests {
    use super::super::*;
    use serial_test::serial;
    use std::env;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn clear_tensorpad_env_vars() {
        for var in [ENV_BIND_ADDR, ENV_DEVICE, ENV_FRAMEWORK, ENV_LOG_LEVEL] {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_empty_document_yields_defaults() {
        clear_tensorpad_env_vars();

        let config = ConfigLoader::from_str("").unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:8000");
        assert!(config.server.enable_cors);
        assert!(config.server.cors_origins.is_none());
        assert_eq!(config.framework.module, "torch");
        assert_eq!(config.framework.nn_module, "torch.nn");
        assert_eq!(config.framework.device, DevicePreference::Auto);
        assert_eq!(config.logging.level, "info");
        assert!(config.python.extra_paths.is_empty());
    }

    #[test]
    #[serial]
    fn test_partial_yaml_keeps_other_defaults() {
        clear_tensorpad_env_vars();

        let yaml = r#"
server:
  bind_addr: "127.0.0.1:9100"
framework:
  device: cpu
"#;
        let config = ConfigLoader::from_str(yaml).unwrap();
        assert_eq!(config.server.bind_addr, "127.0.0.1:9100");
        assert_eq!(config.server.socket_addr().unwrap().port(), 9100);
        assert_eq!(config.server.max_body_size, 1024 * 1024);
        assert_eq!(config.framework.device, DevicePreference::Cpu);
        assert_eq!(config.framework.module, "torch");
    }

    #[test]
    #[serial]
    fn test_invalid_values_are_rejected() {
        clear_tensorpad_env_vars();

        let bad_addr = "server:\n  bind_addr: \"not-an-address\"\n";
        assert!(matches!(
            ConfigLoader::from_str(bad_addr),
            Err(crate::errors::RuntimeError::ConfigError(_))
        ));

        let bad_device = "framework:\n  device: tpu\n";
        assert!(ConfigLoader::from_str(bad_device).is_err());

        let empty_module = "framework:\n  module: \"\"\n";
        assert!(ConfigLoader::from_str(empty_module).is_err());

        let zero_body = "server:\n  max_body_size: 0\n";
        assert!(ConfigLoader::from_str(zero_body).is_err());
    }

    #[test]
    #[serial]
    fn test_environment_overrides_file_values() {
        clear_tensorpad_env_vars();
        env::set_var(ENV_BIND_ADDR, "127.0.0.1:7000");
        env::set_var(ENV_DEVICE, "CUDA");
        env::set_var(ENV_FRAMEWORK, "minitorch");

        let config = ConfigLoader::from_str("server:\n  bind_addr: \"0.0.0.0:8000\"\n").unwrap();
        clear_tensorpad_env_vars();

        assert_eq!(config.server.bind_addr, "127.0.0.1:7000");
        assert_eq!(config.framework.device, DevicePreference::Cuda);
        assert_eq!(config.framework.module, "minitorch");
        assert_eq!(config.framework.nn_module, "minitorch.nn");
    }

    #[tokio::test]
    #[serial]
    async fn test_from_file_resolves_relative_python_paths() {
        clear_tensorpad_env_vars();

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "python:\n  extra_paths:\n    - vendor\n    - /opt/site-packages").unwrap();

        let config = load_config(file.path()).await.unwrap();
        let base = file.path().parent().unwrap();
        assert_eq!(config.python.extra_paths[0], base.join("vendor"));
        assert_eq!(
            config.python.extra_paths[1],
            std::path::PathBuf::from("/opt/site-packages")
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_file_is_config_error() {
        clear_tensorpad_env_vars();

        let result = ConfigLoader::load(Some(std::path::Path::new("/nonexistent/tensorpad.yaml"))).await;
        assert!(matches!(
            result,
            Err(crate::errors::RuntimeError::ConfigError(_))
        ));
    }

    #[test]
    fn test_device_preference_parsing() {
        assert_eq!("auto".parse::<DevicePreference>().unwrap(), DevicePreference::Auto);
        assert_eq!(" MPS ".parse::<DevicePreference>().unwrap(), DevicePreference::Mps);
        assert_eq!("gpu".parse::<DevicePreference>().unwrap(), DevicePreference::Cuda);
        assert_eq!(DevicePreference::Cpu.to_string(), "cpu");
        assert!("npu".parse::<DevicePreference>().is_err());
    }
}

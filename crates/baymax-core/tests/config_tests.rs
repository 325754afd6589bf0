use baymax_core::config::{expand_path, resolve_with_base, Config, EmbeddingProvider, Settings};
use figment::Jail;
use std::path::Path;

#[test]
fn defaults_follow_the_service_layout() {
    let s = Settings::default();
    assert_eq!(s.data.collection, "health_kb");
    assert_eq!(s.data.persist_dir, "rag_store");
    assert_eq!(s.embedding.model, "nomic-embed-text");
    assert_eq!(s.embedding.batch_size, 64);
    assert_eq!(s.retrieval.top_k, 4);
    assert!(s.generation.api_key.is_none());
    s.validate().expect("defaults are valid");
}

#[test]
fn toml_env_file_and_env_vars_layer_in_order() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
                [data]
                collection = "from_base"
                kb_file = "base_kb.json"

                [embedding]
                provider = "fake"
            "#,
        )?;
        jail.create_file("config.test.toml", "[data]\ncollection = \"from_test\"\n")?;
        jail.set_env("APP_RETRIEVAL__TOP_K", "7");
        jail.set_env("APP_GENERATION__API_KEY", "secret-key");

        let config = Config::from_figment(Config::layered("test"));
        let s = config.settings().expect("settings");

        assert_eq!(s.data.collection, "from_test");
        assert_eq!(s.data.kb_file, "base_kb.json");
        assert_eq!(s.data.mb_file, "mb.json", "untouched keys keep defaults");
        assert_eq!(s.embedding.provider, EmbeddingProvider::Fake);
        assert_eq!(s.retrieval.top_k, 7);
        assert_eq!(config.get::<usize>("retrieval.top_k").expect("get"), 7);
        assert!(!format!("{:?}", s.generation).contains("secret-key"));
        Ok(())
    });
}

#[test]
fn production_settings_load_without_a_generation_key() {
    Jail::expect_with(|jail| {
        jail.set_env("APP_EMBEDDING__PROVIDER", "fake");
        let settings = Config::from_figment(Config::layered("production")).settings().expect("settings");
        assert_eq!(settings.embedding.provider, EmbeddingProvider::Fake);
        assert!(settings.generation.api_key.is_none());
        Ok(())
    });
}

#[test]
fn invalid_values_are_rejected() {
    Jail::expect_with(|jail| {
        jail.set_env("APP_EMBEDDING__BATCH_SIZE", "0");
        let config = Config::from_figment(Config::layered("dev"));
        assert!(config.settings().is_err());
        Ok(())
    });
}

#[test]
fn relative_paths_resolve_against_base() {
    let base = Path::new("/srv/baymax");
    assert_eq!(resolve_with_base(base, "kb.json"), base.join("kb.json"));
    assert_eq!(resolve_with_base(base, "/data/kb.json"), Path::new("/data/kb.json"));
    assert_eq!(expand_path("plain/path"), Path::new("plain/path"));
}

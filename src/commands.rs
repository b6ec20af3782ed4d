use crate::config::Config;
use crate::controller::{ChatController, Settlement, SubmitRejection};
use crate::events::Preferences;
use crate::render::lines_to_text;
use crate::service::RecipeService;
use anyhow::{bail, Result};
use std::path::PathBuf;

/// Run a single exchange and print the recipe.
pub async fn ask(
    config: &Config,
    service: &dyn RecipeService,
    entry: &str,
    preferences: Preferences,
    save: bool,
) -> Result<()> {
    let mut controller = ChatController::from_config(config);

    let settlement = match controller.submit(service, entry, preferences).await {
        Ok(settlement) => settlement,
        Err(SubmitRejection::EmptyEntry) => bail!("Please describe the ingredients you have."),
        Err(SubmitRejection::Busy) => bail!("Another request is still in flight."),
    };

    match settlement {
        Settlement::Replied => {}
        Settlement::RolledBack { notice, .. } => bail!(notice),
        Settlement::Stale => bail!("The reply arrived for an abandoned request."),
    }

    if let Some(reply) = controller.transcript().last() {
        println!("{}", lines_to_text(&reply.rendered));
    }

    if save {
        if let Some(path) = controller.download()? {
            eprintln!("💾 Recipe saved to {}", path.display());
        }
    }

    Ok(())
}

pub fn show_config(config: &Config) -> Result<()> {
    println!("⚙️  ChatBite configuration");
    println!("{}", "=".repeat(50));
    println!("📄 File:          {}", config.config_path().display());
    println!("🌐 Endpoint:      {}", config.endpoint);
    println!("💾 Download dir:  {}", config.download_dir.display());
    println!(
        "⏱️  Timeout:       {}",
        if config.request_timeout_secs == 0 {
            "none".to_string()
        } else {
            format!("{}s", config.request_timeout_secs)
        }
    );
    println!("🔔 Notice:        {}ms", config.notice_millis);
    println!("📝 Markdown:      {}", if config.render_markdown { "on" } else { "off" });
    println!("🍽️  Preferences:   {}", config.preferences.summary());
    Ok(())
}

pub fn set_endpoint(config: &mut Config, endpoint: String) -> Result<()> {
    let endpoint = endpoint.trim().to_string();
    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        bail!("Endpoint must be an http:// or https:// URL");
    }
    config.set_endpoint(endpoint);
    config.save()?;
    println!("✅ Endpoint set to {}", config.endpoint);
    Ok(())
}

pub fn set_download_dir(config: &mut Config, dir: PathBuf) -> Result<()> {
    config.set_download_dir(dir);
    config.save()?;
    println!("✅ Recipes will be saved to {}", config.download_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{ChatReply, ChatRequest, ServiceError};
    use async_trait::async_trait;

    struct FixedReply(&'static str);

    #[async_trait]
    impl RecipeService for FixedReply {
        async fn send_chat(&self, _request: &ChatRequest) -> Result<ChatReply, ServiceError> {
            Ok(ChatReply::new(self.0))
        }
    }

    struct Unreachable;

    #[async_trait]
    impl RecipeService for Unreachable {
        async fn send_chat(&self, _request: &ChatRequest) -> Result<ChatReply, ServiceError> {
            Err(ServiceError::Transport("connection refused".into()))
        }
    }

    fn config_in(dir: &std::path::Path) -> Config {
        Config {
            download_dir: dir.to_path_buf(),
            chatbite_home: dir.to_path_buf(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn ask_saves_recipe_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        ask(&config, &FixedReply("Mix flour and water."), "flour", Preferences::default(), true)
            .await
            .unwrap();

        let saved = std::fs::read_to_string(dir.path().join("chatbite-recipe.txt")).unwrap();
        assert_eq!(saved, "Mix flour and water.");
    }

    #[tokio::test]
    async fn ask_reports_notice_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let err = ask(&config, &Unreachable, "flour", Preferences::default(), false)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), crate::controller::NETWORK_NOTICE);
    }

    #[tokio::test]
    async fn ask_rejects_blank_input() {
        let config = Config::default();
        let err = ask(&config, &FixedReply("x"), "  ", Preferences::default(), false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ingredients"));
    }

    #[test]
    fn endpoint_must_be_http() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        assert!(set_endpoint(&mut config, "ftp://nope".to_string()).is_err());
        set_endpoint(&mut config, "https://kitchen.example/api/chat".to_string()).unwrap();
        assert!(dir.path().join("config.toml").exists());
    }
}

//! Session controller
//!
//! Owns the account registry and the credential store, keeps a [`Toolbox`]
//! configured for the active account and turns each command line into a
//! reply. A command never ends the session: every outcome is text.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::credentials::{CredentialStore, LoopbackAuthorizer};
use crate::error::{Error, Result};
use crate::genai::{GenerativeClient, TextGenerator};
use crate::gmail::GmailClient;
use crate::models::{clean_account_name, Account, Intent};
use crate::rate_limiter::GlobalRateLimiter;
use crate::registry::AccountRegistry;
use crate::router::IntentRouter;
use crate::token_provider::create_token_provider;
use crate::tools::Toolbox;

/// Reply when no account is configured or selected
pub const NO_ACCOUNT: &str = "Please set up and select a Gmail account first";

pub struct Assistant {
    config: Config,
    registry: AccountRegistry,
    credentials: Arc<CredentialStore>,
    gmail: GmailClient,
    router: IntentRouter,
    toolbox: Option<Toolbox>,
    connected_email: Option<String>,
}

impl Assistant {
    pub fn new(
        config: Config,
        registry: AccountRegistry,
        credentials: Arc<CredentialStore>,
    ) -> Result<Self> {
        let rate_limiter = GlobalRateLimiter::new(config.gmail.rate_limit_per_second);
        let gmail = GmailClient::new(&config.gmail, rate_limiter)?;
        let router = IntentRouter::new().with_list_count(config.gmail.list_default_count);
        Ok(Self {
            config,
            registry,
            credentials,
            gmail,
            router,
            toolbox: None,
            connected_email: None,
        })
    }

    /// Wire up the file-backed registry, token files and browser authorization
    pub fn from_config(config: Config) -> Result<Self> {
        let registry = AccountRegistry::load(config.accounts_path());
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.gmail.request_timeout_secs))
            .build()?;
        let credentials = Arc::new(CredentialStore::new(
            create_token_provider(&config),
            Arc::new(LoopbackAuthorizer::new(&config.oauth)),
            &config.oauth,
            http,
        ));
        Self::new(config, registry, credentials)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &AccountRegistry {
        &self.registry
    }

    /// Registry changes are picked up on the next command
    pub fn registry_mut(&mut self) -> &mut AccountRegistry {
        &mut self.registry
    }

    /// Handle one command line
    pub async fn handle(&mut self, line: &str) -> String {
        let Some(account) = self.registry.get_active().cloned() else {
            return NO_ACCOUNT.to_string();
        };

        let intent = match self.router.parse(line) {
            Ok(intent) => intent,
            Err(e) => return e.to_string(),
        };
        info!("Handling {} for {}", intent.name(), account.name);

        let connected = match &intent {
            Intent::ConnectEmail { address } => Some(address.clone()),
            _ => None,
        };

        let reply = {
            let toolbox = self.toolbox_for(&account).await;
            dispatch(toolbox, intent).await
        };
        // after toolbox_for, which resets the address on an account switch
        if connected.is_some() {
            self.connected_email = connected;
        }

        self.sync_token_material();
        reply
    }

    /// Toolbox for the account, rebuilt whenever the record changed
    async fn toolbox_for(&mut self, account: &Account) -> &mut Toolbox {
        let toolbox = match self.toolbox.take() {
            Some(toolbox) if toolbox.account() == account => toolbox,
            previous => {
                if previous.is_some_and(|t| t.account().name != account.name) {
                    self.connected_email = None;
                }
                debug!("Configuring tools for {}", account.name);

                let mut toolbox = Toolbox::configure(
                    account,
                    self.credentials.clone(),
                    self.gmail.clone(),
                    self.generator_for(account),
                )
                .await;
                if let Some(email) = &self.connected_email {
                    toolbox.set_connected_email(email);
                }
                toolbox
            }
        };
        self.toolbox.insert(toolbox)
    }

    fn generator_for(&self, account: &Account) -> Option<Arc<dyn TextGenerator>> {
        let key = account.summary_key()?;
        match GenerativeClient::new(&self.config.generative, key) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                warn!("Generative client unavailable: {}", e);
                None
            }
        }
    }

    /// Write refreshed or newly issued credentials back to the account record
    fn sync_token_material(&mut self) {
        let Some(toolbox) = &self.toolbox else {
            return;
        };
        let Some(material) = toolbox.token_material() else {
            return;
        };
        let name = toolbox.account().name.clone();

        match self.registry.set_token_material(&name, Some(material)) {
            Ok(()) => debug!("Token material for {} is current", name),
            Err(e) => warn!("Could not store token material for {}: {}", name, e),
        }
    }

    /// Run interactive authorization for an account and store the result
    pub async fn login(&mut self, name: &str) -> Result<String> {
        let name = clean_account_name(name);
        let account = self
            .registry
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(name.to_string()))?;

        let mut session = self.credentials.configure(&account).await;
        self.credentials.authorize(&mut session).await?;
        self.registry.set_token_material(
            &account.name,
            CredentialStore::export_token_material(&session),
        )?;

        info!("Authorized account {}", account.name);
        Ok(format!("Authorized account '{}'", account.name))
    }

    /// Whether an account has credentials, in its record or a token file
    pub async fn is_authorized(&self, name: &str) -> bool {
        let name = clean_account_name(name);
        if self
            .registry
            .get(name)
            .is_some_and(|a| a.token_material.is_some())
        {
            return true;
        }
        match self.credentials.token_provider().has_tokens(name).await {
            Ok(found) => found,
            Err(e) => {
                debug!("Token lookup for {} failed: {}", name, e);
                false
            }
        }
    }

    /// Remove an account and its local token file
    pub async fn remove_account(&mut self, name: &str) -> Result<String> {
        let message = self.registry.remove(name)?;
        let name = clean_account_name(name);
        if let Err(e) = self.credentials.token_provider().delete_tokens(name).await {
            warn!("Could not delete token file for {}: {}", name, e);
        }
        if self
            .toolbox
            .as_ref()
            .is_some_and(|t| t.account().name == name)
        {
            self.toolbox = None;
        }
        Ok(message)
    }
}

async fn dispatch(toolbox: &mut Toolbox, intent: Intent) -> String {
    match intent {
        Intent::ConnectEmail { address } => {
            toolbox.set_connected_email(&address);
            format!("Successfully connected to {}", address)
        }
        Intent::DraftEmail { to, subject, body } => {
            toolbox.drafter.draft_email(&to, &subject, &body).await
        }
        Intent::SendEmail { to, subject, body } => {
            toolbox.drafter.send_email(&to, &subject, &body).await
        }
        Intent::AnalyzeEmail { content_or_id } => {
            toolbox.analyzer.analyze_email(&content_or_id).await
        }
        Intent::SuggestResponse { content_or_id } => {
            toolbox.suggester.suggest_response(&content_or_id).await
        }
        Intent::ListEmails { count } => toolbox.analyzer.list_recent_emails(count).await,
        Intent::ListEmailsOn { date } => toolbox.analyzer.list_emails_on(date).await,
        Intent::SummarizeEmails { count } => {
            toolbox.analyzer.summarize_recent_emails(count).await
        }
        Intent::FindEmail { query, count } => toolbox.finder.find_emails(&query, count).await,
        Intent::ListLabels => toolbox.labels.list_labels().await,
        Intent::AddLabel { name, email_id } => toolbox.labels.add_label(&name, &email_id).await,
        Intent::RemoveLabel { name, email_id } => {
            toolbox.labels.remove_label(&name, &email_id).await
        }
        Intent::GeneralRequest { text } => toolbox.processor.process_request(&text).await,
    }
}

// src/config.rs

use anyhow::{anyhow, Context};
use sqlx::postgres::PgPoolOptions;
use std::{fmt::Display, path::PathBuf, str::FromStr, sync::Arc, time::Duration};
use uuid::Uuid;

use crate::{
    db::{InventoryRepository, PgInventoryRepository, ReportStorage, SupabaseStorage},
    services::{
        dashboard_service::DashboardService,
        inventory_service::InventoryService,
        inventory_state::DEFAULT_EXPIRING_DAYS,
        notification_service::{EmailJsMailer, MessagingProvider, ReportMailer, TwilioWhatsApp},
        quick_adjust::QuickAdjuster,
        report_service::ReportService,
    },
};

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub url: String,
    pub service_key: String,
    pub bucket: String,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub service_id: String,
    pub template_id: String,
    pub public_key: String,
}

#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub phone_number: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    // Identidade fixa gravada nas movimentações (não há login)
    pub acting_user: Uuid,
    pub quick_adjust_delay: Duration,
    pub expiring_days: u64,
    pub fonts_dir: PathBuf,
    // Integrações opcionais: ausentes = endpoints respondem 503
    pub storage: Option<StorageConfig>,
    pub email: Option<EmailConfig>,
    pub whatsapp: Option<WhatsAppConfig>,
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Valor inválido para {}: {} ({})", key, raw, e)),
        None => Ok(default),
    }
}

impl Config {
    /// Lê o `.env` (se existir) e as variáveis de ambiente.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let database_url = get("DATABASE_URL").context("DATABASE_URL deve ser definida")?;

        let storage = match (get("SUPABASE_URL"), get("SUPABASE_SERVICE_KEY")) {
            (Some(url), Some(service_key)) => Some(StorageConfig {
                url,
                service_key,
                bucket: get("REPORTS_BUCKET").unwrap_or_else(|| "reportes".to_string()),
            }),
            _ => None,
        };

        let email = match (
            get("EMAILJS_SERVICE_ID"),
            get("EMAILJS_TEMPLATE_ID"),
            get("EMAILJS_PUBLIC_KEY"),
        ) {
            (Some(service_id), Some(template_id), Some(public_key)) => Some(EmailConfig {
                service_id,
                template_id,
                public_key,
            }),
            _ => None,
        };

        let whatsapp = match (
            get("TWILIO_SID"),
            get("TWILIO_AUTH_TOKEN"),
            get("TWILIO_PHONE_NUMBER"),
        ) {
            (Some(account_sid), Some(auth_token), Some(phone_number)) => Some(WhatsAppConfig {
                account_sid,
                auth_token,
                phone_number,
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            db_max_connections: parse_or(get("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", 5)?,
            acting_user: parse_or(get("ACTING_USER_ID"), "ACTING_USER_ID", Uuid::nil())?,
            quick_adjust_delay: Duration::from_millis(parse_or(
                get("QUICK_ADJUST_DELAY_MS"),
                "QUICK_ADJUST_DELAY_MS",
                500,
            )?),
            expiring_days: parse_or(
                get("EXPIRING_DAYS_DEFAULT"),
                "EXPIRING_DAYS_DEFAULT",
                DEFAULT_EXPIRING_DAYS,
            )?,
            fonts_dir: get("FONTS_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("./fonts")),
            storage,
            email,
            whatsapp,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub inventory_service: InventoryService,
    pub dashboard_service: DashboardService,
    pub report_service: ReportService,
    pub quick_adjuster: QuickAdjuster,
    pub mailer: Option<Arc<dyn ReportMailer>>,
    pub messenger: Option<Arc<dyn MessagingProvider>>,
    pub expiring_days: u64,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        sqlx::migrate!().run(&db_pool).await?;
        tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

        // --- Integrações opcionais ---
        let storage = match &config.storage {
            Some(s) => Some(Arc::new(SupabaseStorage::new(&s.url, &s.service_key, &s.bucket)?)
                as Arc<dyn ReportStorage>),
            None => {
                tracing::warn!("Almacenamiento de reportes no configurado (SUPABASE_URL)");
                None
            }
        };

        let mailer = match &config.email {
            Some(e) => Some(Arc::new(EmailJsMailer::new(&e.service_id, &e.template_id, &e.public_key)?)
                as Arc<dyn ReportMailer>),
            None => {
                tracing::warn!("Envío de correo no configurado (EMAILJS_*)");
                None
            }
        };

        let messenger = match &config.whatsapp {
            Some(w) => Some(Arc::new(TwilioWhatsApp::new(&w.account_sid, &w.auth_token, &w.phone_number)?)
                as Arc<dyn MessagingProvider>),
            None => {
                tracing::warn!("WhatsApp no configurado (TWILIO_*)");
                None
            }
        };

        let repo = Arc::new(PgInventoryRepository::new(db_pool));
        let state = Self::from_parts(config, repo, storage, mailer, messenger);

        // Carga inicial do espelho em memória
        state.inventory_service.load_items().await;
        state.inventory_service.load_movements().await;

        Ok(state)
    }

    /// Monta o gráfico de dependências a partir de colaboradores já criados.
    pub fn from_parts(
        config: &Config,
        repo: Arc<dyn InventoryRepository>,
        storage: Option<Arc<dyn ReportStorage>>,
        mailer: Option<Arc<dyn ReportMailer>>,
        messenger: Option<Arc<dyn MessagingProvider>>,
    ) -> Self {
        let inventory_service = InventoryService::new(repo, config.acting_user);
        let dashboard_service = DashboardService::new(inventory_service.clone(), config.expiring_days);
        let report_service =
            ReportService::new(inventory_service.clone(), config.fonts_dir.clone(), storage);
        let quick_adjuster = QuickAdjuster::new(inventory_service.clone(), config.quick_adjust_delay);

        Self {
            inventory_service,
            dashboard_service,
            report_service,
            quick_adjuster,
            mailer,
            messenger,
            expiring_days: config.expiring_days,
        }
    }
}

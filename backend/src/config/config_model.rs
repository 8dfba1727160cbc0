use crates::domain::value_objects::receiver_identity::VerifiedReceiverIdentity;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub supabase: Supabase,
    pub slip_verifier: SlipVerifier,
    pub payment_gateway: PaymentGateway,
    pub receiver_identity: VerifiedReceiverIdentity,
    pub realtime: Option<Realtime>,
    pub qr_expiry_sweep: QrExpirySweep,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    /// Megabytes; slip images arrive as multipart uploads.
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct Supabase {
    pub jwt_secret: String,
}

#[derive(Debug, Clone)]
pub struct SlipVerifier {
    pub api_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct PaymentGateway {
    pub api_url: String,
    pub api_key: String,
    pub merchant_id: String,
    pub webhook_secret: String,
}

#[derive(Debug, Clone)]
pub struct Realtime {
    pub publish_url: String,
    pub api_key: String,
    pub channel: String,
}

#[derive(Debug, Clone)]
pub struct QrExpirySweep {
    /// Zero disables the sweep.
    pub interval_secs: u64,
}

//! Colaboradores externos a los que recurre el pipeline de submit/connect
//! (spec.md §4.6 pasos 3–5, §5): revalidación de auth, autorización de
//! particiones y validación de eventos a nivel aplicación. Los despliegues
//! reales enchufan su propio verificador de tokens y su política de
//! autorización; las implementaciones de referencia de aquí aceptan todo,
//! el mismo rol que los stand-ins por defecto estilo `AllowAllPolicy` juegan
//! para `chem-policies`.

use async_trait::async_trait;
use serde_json::Value;

use converge_core::wire::FieldError;

#[async_trait]
pub trait AuthVerifier: Send + Sync {
    /// Verifica `token` y devuelve la identidad que atestigua. El llamador
    /// la compara contra el `client_id` reclamado (spec.md §4.5: "El claim
    /// de identidad `clientId` DEBE igualar el `client_id` del payload").
    /// `Err` dispara `error{auth_failed}` y cierra.
    async fn verify(&self, token: &str, client_id: &str) -> Result<String, String>;
}

#[async_trait]
pub trait Authorizer: Send + Sync {
    /// `Ok(())` si `identity` puede leer/escribir `partitions`; `Err`
    /// produce `forbidden` (spec.md §4.6 paso 4, §4.7 paso 1).
    async fn authorize_partitions(&self, identity: Option<&str>, partitions: &[String]) -> Result<(), String>;
}

#[async_trait]
pub trait EventValidator: Send + Sync {
    /// Validación a nivel aplicación del payload `event` de un ítem de
    /// submit (spec.md §4.6 paso 5). `Ok(())` continúa hacia el commit;
    /// `Err` produce un resultado rechazado con los field errors dados.
    async fn validate(&self, partitions: &[String], event: &Value) -> Result<(), Vec<FieldError>>;
}

/// Acepta todo token (spec.md §1: la auth concreta está fuera de alcance).
pub struct AllowAllAuth;

#[async_trait]
impl AuthVerifier for AllowAllAuth {
    async fn verify(&self, _token: &str, client_id: &str) -> Result<String, String> {
        Ok(client_id.to_string())
    }
}

/// Otorga acceso a toda partición (spec.md §1: la authz concreta está fuera
/// de alcance).
pub struct AllowAllAuthorizer;

#[async_trait]
impl Authorizer for AllowAllAuthorizer {
    async fn authorize_partitions(&self, _identity: Option<&str>, _partitions: &[String]) -> Result<(), String> {
        Ok(())
    }
}

/// Acepta todo payload de evento (spec.md §1: los reducers/reglas de
/// validación concretos están fuera de alcance).
pub struct NoopValidator;

#[async_trait]
impl EventValidator for NoopValidator {
    async fn validate(&self, _partitions: &[String], _event: &Value) -> Result<(), Vec<FieldError>> {
        Ok(())
    }
}

//! Subcommand execution
//!
//! Every command yields a JSON value; printing is left to `main`.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Value, json};
use storefront_api::{AuthService, OrderService, OrderStatus, ProductInput, ProductService, UserService};
use storefront_client::AuthenticatedHttpClient;
use tracing::info;

use crate::cli::{Commands, OrderCommands, ProductCommands};
use crate::error::Error;

pub async fn run(client: AuthenticatedHttpClient, command: Commands) -> Result<Value> {
    match command {
        Commands::Login(args) => {
            let user = AuthService::new(client)
                .login(&args.email, &args.password)
                .await
                .context("login failed")?;
            Ok(json!({ "logged_in": true, "user": user }))
        }
        Commands::Logout => {
            AuthService::new(client).logout().await;
            Ok(json!({ "logged_in": false }))
        }
        Commands::Whoami => {
            require_session(&client).await?;
            to_json(UserService::new(client).me().await.map_err(session_aware)?)
        }
        Commands::Products(command) => products(ProductService::new(client), command).await,
        Commands::Orders(command) => {
            require_session(&client).await?;
            orders(OrderService::new(client), command).await
        }
    }
}

async fn products(service: ProductService, command: ProductCommands) -> Result<Value> {
    match command {
        ProductCommands::List => to_json(service.list().await.map_err(session_aware)?),
        ProductCommands::Get { id } => to_json(service.get(id).await.map_err(session_aware)?),
        ProductCommands::Create(args) => {
            let input = ProductInput::from(&args);
            to_json(service.create(&input).await.map_err(session_aware)?)
        }
        ProductCommands::Update { id, product } => {
            let input = ProductInput::from(&product);
            to_json(service.update(id, &input).await.map_err(session_aware)?)
        }
        ProductCommands::Delete { id } => {
            service.delete(id).await.map_err(session_aware)?;
            Ok(json!({ "deleted": id }))
        }
    }
}

async fn orders(service: OrderService, command: OrderCommands) -> Result<Value> {
    match command {
        OrderCommands::List => to_json(service.list().await.map_err(session_aware)?),
        OrderCommands::Get { id } => to_json(service.get(id).await.map_err(session_aware)?),
        OrderCommands::Status { id, status } => {
            let status = match OrderStatus::parse(&status) {
                OrderStatus::Other(raw) => return Err(Error::UnknownStatus(raw).into()),
                known => known,
            };

            let current = service.get(id).await.map_err(session_aware)?;
            if current.status.is_final() {
                return Err(Error::OrderFinal {
                    id,
                    status: current.status.to_string(),
                }
                .into());
            }
            if current.status == status {
                info!(id, %status, "order already has this status");
                return to_json(current);
            }

            to_json(service.update_status(id, &status).await.map_err(session_aware)?)
        }
    }
}

async fn require_session(client: &AuthenticatedHttpClient) -> Result<()> {
    if !client.is_authenticated().await {
        return Err(Error::NotLoggedIn.into());
    }
    Ok(())
}

/// Swap an expired-session failure for a message that says what to do.
fn session_aware(err: storefront_api::Error) -> anyhow::Error {
    if err.is_auth_expired() {
        Error::SessionExpired.into()
    } else {
        err.into()
    }
}

fn to_json<T: Serialize>(value: T) -> Result<Value> {
    serde_json::to_value(value).context("failed to encode output")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::LoginArgs;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use storefront_auth::{Credential, CredentialStore, MemoryCredentialStore};
    use storefront_client::ClientConfig;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(
        server: &MockServer,
        credential: Option<Credential>,
    ) -> (AuthenticatedHttpClient, Arc<MemoryCredentialStore>, Arc<AtomicUsize>) {
        let store = Arc::new(match credential {
            Some(c) => MemoryCredentialStore::with_credential(c),
            None => MemoryCredentialStore::new(),
        });
        let logouts = Arc::new(AtomicUsize::new(0));
        let counter = logouts.clone();
        let client = AuthenticatedHttpClient::builder(ClientConfig::new(server.uri()))
            .credential_store(store.clone())
            .logout_hook(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap();
        (client, store, logouts)
    }

    fn order_json(id: u64, status: &str) -> Value {
        json!({
            "id": id,
            "status": status,
            "customerName": "Maria",
            "totalAmount": 10.0,
            "items": []
        })
    }

    #[tokio::test]
    async fn login_then_whoami() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "A1",
                "refresh_token": "R1"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1, "name": "Admin", "email": "admin@shop.test", "roles": ["admin"]
            })))
            .mount(&server)
            .await;

        let (client, store, _) = client(&server, None);
        let login = Commands::Login(LoginArgs {
            email: "admin@shop.test".into(),
            password: "pw".into(),
        });
        let out = run(client.clone(), login).await.unwrap();
        assert_eq!(out["logged_in"], true);
        assert!(store.get().await.is_some());

        let me = run(client, Commands::Whoami).await.unwrap();
        assert_eq!(me["email"], "admin@shop.test");
    }

    #[tokio::test]
    async fn whoami_without_session_does_not_call_backend() {
        let server = MockServer::start().await;
        let (client, _, _) = client(&server, None);

        let err = run(client, Commands::Whoami).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NotLoggedIn)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn expired_session_is_reported_and_cleared() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orders"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh-token"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let (client, store, logouts) = client(&server, Some(Credential::new("A1", Some("R1".into()))));
        let err = run(client, Commands::Orders(OrderCommands::List)).await.unwrap_err();

        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::SessionExpired)));
        assert!(store.get().await.is_none());
        assert_eq!(logouts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn status_change_on_completed_order_is_refused() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orders/3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(order_json(3, "Concluído")))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/orders/3/status"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (client, _, _) = client(&server, Some(Credential::new("A1", Some("R1".into()))));
        let command = Commands::Orders(OrderCommands::Status {
            id: 3,
            status: "cancelled".into(),
        });
        let err = run(client, command).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::OrderFinal { id: 3, .. })));
    }

    #[tokio::test]
    async fn status_change_patches_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orders/5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(order_json(5, "Pendente")))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/orders/5/status"))
            .and(body_json(json!({"status": "Enviado"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(order_json(5, "Enviado")))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _, _) = client(&server, Some(Credential::new("A1", Some("R1".into()))));
        let command = Commands::Orders(OrderCommands::Status {
            id: 5,
            status: "shipped".into(),
        });
        let out = run(client, command).await.unwrap();
        assert_eq!(out["status"], "Enviado");
    }

    #[tokio::test]
    async fn processing_status_is_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orders/6"))
            .respond_with(ResponseTemplate::new(200).set_body_json(order_json(6, "Pendente")))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/orders/6/status"))
            .and(body_json(json!({"status": "Em processamento"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(order_json(6, "Em processamento")))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _, _) = client(&server, Some(Credential::new("A1", Some("R1".into()))));
        let command = Commands::Orders(OrderCommands::Status {
            id: 6,
            status: "Em processamento".into(),
        });
        let out = run(client, command).await.unwrap();
        assert_eq!(out["status"], "Em processamento");
    }

    #[tokio::test]
    async fn unknown_status_is_rejected_before_any_call() {
        let server = MockServer::start().await;
        let (client, _, _) = client(&server, Some(Credential::new("A1", Some("R1".into()))));
        let command = Commands::Orders(OrderCommands::Status {
            id: 5,
            status: "lost".into(),
        });
        let err = run(client, command).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::UnknownStatus(_))));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn product_delete_reports_id() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/products/8"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "deleted"})))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _, _) = client(&server, Some(Credential::new("A1", Some("R1".into()))));
        let out = run(client, Commands::Products(ProductCommands::Delete { id: 8 }))
            .await
            .unwrap();
        assert_eq!(out, json!({"deleted": 8}));
    }

    #[tokio::test]
    async fn logout_clears_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (client, store, logouts) = client(&server, Some(Credential::new("A1", Some("R1".into()))));
        let out = run(client, Commands::Logout).await.unwrap();
        assert_eq!(out["logged_in"], false);
        assert!(store.get().await.is_none());
        assert_eq!(logouts.load(Ordering::SeqCst), 1);
    }
}

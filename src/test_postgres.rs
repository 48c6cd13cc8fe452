//! Shared PostgreSQL container for the feature-gated engine tests.
//!
//! One container is started per test run; every test connects to its own freshly created
//! database so tracking tables never leak between tests.

use std::sync::OnceLock;

use postgres::{Client, NoTls};
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;
use uuid::Uuid;

// Credentials baked into the testcontainers-modules postgres image.
const PG_USER: &str = "postgres";
const PG_PASSWORD: &str = "postgres";
const PG_DB: &str = "postgres";

struct SharedPostgres {
    port: u16,
    // Both kept alive until the process exits.
    _container: ContainerAsync<Postgres>,
    _runtime: tokio::runtime::Runtime,
}

static POSTGRES: OnceLock<SharedPostgres> = OnceLock::new();

fn shared_postgres() -> &'static SharedPostgres {
    POSTGRES.get_or_init(|| {
        let runtime = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
        let (container, port) = runtime.block_on(async {
            let container = Postgres::default()
                .start()
                .await
                .expect("failed to start postgres container");
            let port = container
                .get_host_port_ipv4(5432)
                .await
                .expect("failed to get postgres port");
            (container, port)
        });
        SharedPostgres {
            port,
            _container: container,
            _runtime: runtime,
        }
    })
}

fn url_with_db(db: &str) -> String {
    format!(
        "postgres://{}:{}@127.0.0.1:{}/{}",
        PG_USER,
        PG_PASSWORD,
        shared_postgres().port,
        db
    )
}

/// Connects to a brand new database on the shared container.
pub fn get_test_client() -> Client {
    let mut admin =
        Client::connect(&url_with_db(PG_DB), NoTls).expect("failed to connect as admin");
    let db_name = format!("test_{}", Uuid::new_v4().simple());
    admin
        .batch_execute(&format!("CREATE DATABASE \"{}\"", db_name))
        .expect("failed to create test database");
    drop(admin);

    Client::connect(&url_with_db(&db_name), NoTls).expect("failed to connect to test database")
}

use std::{env, net::{SocketAddr, ToSocketAddrs as _}};

use sea_orm::ConnectOptions;
use tracing::info;

pub struct Config {
    pub host_address: SocketAddr,

    pub database_opt: ConnectOptions,

    pub recalculation_workers: usize,
}

pub fn load() -> Config {
    Config {
        host_address: load_host_address(),
        database_opt: load_database_opt().into(),
        recalculation_workers: load_recalculation_workers(),
    }
}

fn load_host_address() -> SocketAddr {
    info!("Loading environment `HOST_ADDRESS`");

    let var = env::var("HOST_ADDRESS").unwrap_or_else(|_| "127.0.0.1:0".to_string());
    
    var.to_socket_addrs()
        .expect("`HOST_ADDRESS` is not in a valid format").nth(0)
        .expect("unable to resolve host from `HOST_ADDRESS`")
}

fn load_database_opt() -> impl Into<ConnectOptions> {
    info!("Loading environment `DATABASE_URL`");
    
    let var = env::var("DATABASE_URL").expect("Environment `DATABASE_URL` is required to be set");
    
    var
}

fn load_recalculation_workers() -> usize {
    info!("Loading environment `RECALCULATION_WORKERS`");

    let Ok(var) = env::var("RECALCULATION_WORKERS") else {
        return 2;
    };

    match var.parse::<usize>() {
        Ok(workers) if workers > 0 => workers,
        _ => panic!("`RECALCULATION_WORKERS` must be a positive integer"),
    }
}

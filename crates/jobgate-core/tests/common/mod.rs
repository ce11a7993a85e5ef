pub mod registry_server;

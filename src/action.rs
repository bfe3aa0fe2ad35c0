use crate::ssh::tunnel::CreateRequest;

/// The single operation selected on the command line.
#[derive(Debug, Clone)]
pub enum Action {
    Create(CreateRequest),
    List { json: bool },
    Start(String),
    Stop(String),
    Delete(String),
}

pub mod json_rpc;

pub use json_rpc::JsonRpcClient;

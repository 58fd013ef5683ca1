//! End-to-end tests over real TCP connections.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use canaryfs_control::{
    read_frame, write_frame, CommandHandler, ControlRequest, ControlResponse, ControlServer,
    TcpControlListener,
};
use canaryfs_model::TreeStore;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct RunningServer {
    addr: SocketAddr,
    tree: Arc<TreeStore>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

async fn start_server(seed: &str) -> RunningServer {
    let tree = Arc::new(TreeStore::from_seed(seed).unwrap());
    let handler = Arc::new(CommandHandler::new(tree.clone()));
    let listener = TcpControlListener::bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();

    let shutdown = CancellationToken::new();
    let server = ControlServer::new(handler).with_accept_timeout(Duration::from_millis(50));
    let token: CancellationToken = shutdown.clone();
    let task = tokio::spawn(async move { server.run(listener, token).await });

    RunningServer {
        addr,
        tree,
        shutdown,
        task,
    }
}

async fn call(stream: &mut TcpStream, request: &ControlRequest) -> ControlResponse {
    write_frame(stream, &serde_json::to_vec(request).unwrap())
        .await
        .unwrap();
    let body: Vec<u8> = read_frame(stream).await.unwrap().unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_scenario_over_tcp() {
    let server = start_server("\\Network,true,0,1743942586").await;
    let mut client = TcpStream::connect(server.addr).await.unwrap();

    let created = call(
        &mut client,
        &ControlRequest::new("create_file", "\\Network\\Plan.txt").with_content("hello", false),
    )
    .await;
    assert!(created.success);

    let files = call(&mut client, &ControlRequest::new("list_files", "\\Network")).await;
    assert_eq!(files.data, vec!["Plan.txt"]);
    assert_eq!(server.tree.content("\\Network\\Plan.txt").unwrap().as_ref(), b"hello");

    let deleted = call(&mut client, &ControlRequest::new("delete_file", "\\Network\\Plan.txt")).await;
    assert!(deleted.success);
    let again = call(&mut client, &ControlRequest::new("delete_file", "\\Network\\Plan.txt")).await;
    assert_eq!(again.message, "Failed to delete file");

    server.shutdown.cancel();
    server.task.await.unwrap();
}

#[tokio::test]
async fn test_malformed_json_keeps_connection() {
    let server = start_server("").await;
    let mut client = TcpStream::connect(server.addr).await.unwrap();

    write_frame(&mut client, b"{oops").await.unwrap();
    let body: Vec<u8> = read_frame(&mut client).await.unwrap().unwrap();
    let response: ControlResponse = serde_json::from_slice(&body).unwrap();
    assert!(!response.success);
    assert!(response.message.starts_with("Error: "));

    let listed = call(&mut client, &ControlRequest::new("list_all", "\\")).await;
    assert!(listed.success);

    server.shutdown.cancel();
}

#[tokio::test]
async fn test_oversize_frame_closes_only_that_client() {
    let server = start_server("").await;

    let mut bad = TcpStream::connect(server.addr).await.unwrap();
    bad.write_all(&(2 * 1024 * 1024i32).to_le_bytes()).await.unwrap();
    assert!(read_frame(&mut bad).await.unwrap().is_none());

    let mut good = TcpStream::connect(server.addr).await.unwrap();
    let response = call(&mut good, &ControlRequest::new("create_directory", "\\ok")).await;
    assert!(response.success);
    assert_eq!(server.tree.directory_names("\\"), vec!["ok"]);

    server.shutdown.cancel();
}

#[tokio::test]
async fn test_clients_are_served_concurrently() {
    let server = start_server("").await;

    // An idle client must not block others.
    let _idle = TcpStream::connect(server.addr).await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..4 {
        let addr: SocketAddr = server.addr;
        tasks.push(tokio::spawn(async move {
            let mut client = TcpStream::connect(addr).await.unwrap();
            let path: String = format!("\\c{}\\f.txt", i);
            call(&mut client, &ControlRequest::new("create_file", path).with_content("x", false))
                .await
                .success
        }));
    }
    for task in tasks {
        assert!(task.await.unwrap());
    }
    assert_eq!(server.tree.directory_names("\\").len(), 4);

    server.shutdown.cancel();
    server.task.await.unwrap();
}

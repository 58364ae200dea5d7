use mbslave::{Server, UnitId};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

async fn start_server() -> (Server, std::net::SocketAddr, tokio::sync::mpsc::Receiver<String>) {
    let mut server = Server::new(UnitId::new(0xFF)).unwrap();

    {
        let database = server.database();
        let mut tables = database.lock().await;
        tables.coils = vec![0; 65536];
        tables.discrete_inputs = vec![0; 65536];
        tables.holding_registers = vec![0; 2000];
        tables.input_registers = vec![0; 2000];
    }

    let records = server.listen_requests().unwrap();
    let addr = server
        .listen_tcp("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();

    (server, addr, records)
}

async fn transact(stream: &mut TcpStream, request: &[u8], response_len: usize) -> Vec<u8> {
    stream.write_all(request).await.unwrap();
    let mut response = vec![0; response_len];
    stream.read_exact(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn services_requests_over_tcp() {
    let (mut server, addr, mut records) = start_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    // write nine coils starting at 100
    let response = transact(
        &mut stream,
        &[
            0x00, 0x01, 0x00, 0x00, 0x00, 0x09, 0xFF, 0x0F, 0x00, 0x64, 0x00, 0x09, 0x02, 0xFF,
            0x01,
        ],
        12,
    )
    .await;
    assert_eq!(
        response,
        &[0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0xFF, 0x0F, 0x00, 0x64, 0x00, 0x09]
    );

    let record = records.recv().await.unwrap();
    assert!(record.contains("device: 255"));
    assert!(record.contains("function: writeMultipleCoils"));

    // read them back as sixteen bits
    let response = transact(
        &mut stream,
        &[0x00, 0x02, 0x00, 0x00, 0x00, 0x06, 0xFF, 0x01, 0x00, 0x64, 0x00, 0x10],
        11,
    )
    .await;
    assert_eq!(
        response,
        &[0x00, 0x02, 0x00, 0x00, 0x00, 0x05, 0xFF, 0x01, 0x02, 0xFF, 0x01]
    );

    // write two holding registers starting at 1
    let response = transact(
        &mut stream,
        &[
            0x00, 0x03, 0x00, 0x00, 0x00, 0x0B, 0xFF, 0x10, 0x00, 0x01, 0x00, 0x02, 0x04, 0x00,
            0x03, 0x00, 0x04,
        ],
        12,
    )
    .await;
    assert_eq!(
        response,
        &[0x00, 0x03, 0x00, 0x00, 0x00, 0x06, 0xFF, 0x10, 0x00, 0x01, 0x00, 0x02]
    );

    // read them back
    let response = transact(
        &mut stream,
        &[0x00, 0x04, 0x00, 0x00, 0x00, 0x06, 0xFF, 0x03, 0x00, 0x01, 0x00, 0x02],
        13,
    )
    .await;
    assert_eq!(
        response,
        &[0x00, 0x04, 0x00, 0x00, 0x00, 0x07, 0xFF, 0x03, 0x04, 0x00, 0x03, 0x00, 0x04]
    );

    // a known-but-unhandled function code answers with IllegalFunction
    let response = transact(
        &mut stream,
        &[0x00, 0x05, 0x00, 0x00, 0x00, 0x05, 0xFF, 0x2B, 0x0E, 0x01, 0x00],
        9,
    )
    .await;
    assert_eq!(
        response,
        &[0x00, 0x05, 0x00, 0x00, 0x00, 0x03, 0xFF, 0xAB, 0x01]
    );

    // an out-of-range read answers with IllegalDataAddress
    let response = transact(
        &mut stream,
        &[0x00, 0x06, 0x00, 0x00, 0x00, 0x06, 0xFF, 0x04, 0xFF, 0xFF, 0x00, 0x02],
        9,
    )
    .await;
    assert_eq!(
        response,
        &[0x00, 0x06, 0x00, 0x00, 0x00, 0x03, 0xFF, 0x84, 0x02]
    );

    server.close();
}

#[tokio::test]
async fn services_pipelined_requests_in_order() {
    let (mut server, addr, _records) = start_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    // two reads of the same empty register range, written back to back
    let mut pipelined = Vec::new();
    pipelined.extend_from_slice(&[
        0x00, 0x10, 0x00, 0x00, 0x00, 0x06, 0xFF, 0x03, 0x00, 0x00, 0x00, 0x01,
    ]);
    pipelined.extend_from_slice(&[
        0x00, 0x11, 0x00, 0x00, 0x00, 0x06, 0xFF, 0x03, 0x00, 0x00, 0x00, 0x01,
    ]);
    stream.write_all(&pipelined).await.unwrap();

    let mut responses = vec![0; 22];
    stream.read_exact(&mut responses).await.unwrap();

    assert_eq!(
        &responses[..11],
        &[0x00, 0x10, 0x00, 0x00, 0x00, 0x05, 0xFF, 0x03, 0x02, 0x00, 0x00]
    );
    assert_eq!(
        &responses[11..],
        &[0x00, 0x11, 0x00, 0x00, 0x00, 0x05, 0xFF, 0x03, 0x02, 0x00, 0x00]
    );

    server.close();
}

#[tokio::test]
async fn requests_from_multiple_connections_share_the_tables() {
    let (mut server, addr, _records) = start_server().await;

    let mut writer = TcpStream::connect(addr).await.unwrap();
    let mut reader = TcpStream::connect(addr).await.unwrap();

    // one connection writes a register...
    let response = transact(
        &mut writer,
        &[0x00, 0x20, 0x00, 0x00, 0x00, 0x06, 0xFF, 0x06, 0x00, 0x05, 0xAB, 0xCD],
        12,
    )
    .await;
    assert_eq!(
        response,
        &[0x00, 0x20, 0x00, 0x00, 0x00, 0x06, 0xFF, 0x06, 0x00, 0x05, 0xAB, 0xCD]
    );

    // ...and another observes the value
    let response = transact(
        &mut reader,
        &[0x00, 0x21, 0x00, 0x00, 0x00, 0x06, 0xFF, 0x03, 0x00, 0x05, 0x00, 0x01],
        11,
    )
    .await;
    assert_eq!(
        response,
        &[0x00, 0x21, 0x00, 0x00, 0x00, 0x05, 0xFF, 0x03, 0x02, 0xAB, 0xCD]
    );

    server.close();
}

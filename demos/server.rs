use mbslave::{Server, UnitId};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    let address = match args.len() {
        1 => "127.0.0.1:502",
        2 => &args[1],
        _ => {
            eprintln!("Accepts no arguments or the socket address as <ip:port>");
            std::process::exit(-1);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let mut server = Server::new(UnitId::new(0x01))?;

    {
        let database = server.database();
        let mut tables = database.lock().await;
        tables.coils = vec![0; 100];
        tables.discrete_inputs = vec![0; 100];
        tables.holding_registers = vec![0; 200];
        tables.input_registers = vec![0; 200];
    }

    let mut records = server.listen_requests()?;
    let addr = server.listen_tcp(address.parse()?).await?;
    tracing::info!("listening on {}", addr);

    while let Some(record) = records.recv().await {
        tracing::info!("{}", record);
    }

    Ok(())
}

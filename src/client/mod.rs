//! Interactive Chat Client
//!
//! Menu-driven client that sends account requests through the relay server
//! and prints each response line. Strictly request-then-wait: the menu is
//! shown again only after the response for the previous request arrived.

use std::io::Write as _;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::protocol::Request;
use crate::Result;

const MENU: &str = "\n--- CLIENTE CHAT ---\n1. Consultar cuenta\n2. Transferir dinero\n3. Salir";

type StdinLines = Lines<BufReader<Stdin>>;

/// One pass through the interactive menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    AccountQuery,
    Transfer,
    Exit,
}

impl MenuChoice {
    /// Any input other than the two request options exits the session
    pub fn parse(input: &str) -> Self {
        match input.trim() {
            "1" => Self::AccountQuery,
            "2" => Self::Transfer,
            _ => Self::Exit,
        }
    }
}

/// Connection to the relay server, one request/response cycle at a time
pub struct ClientSession {
    reader: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    response_timeout: Duration,
}

impl ClientSession {
    /// Connect to the relay server
    pub async fn connect(server_addr: SocketAddr, response_timeout: Duration) -> Result<Self> {
        let stream = TcpStream::connect(server_addr)
            .await
            .with_context(|| format!("Failed to connect to chat server {}", server_addr))?;

        debug!("Connected to chat server {}", server_addr);
        let (read_half, writer) = stream.into_split();

        Ok(Self {
            reader: BufReader::new(read_half).lines(),
            writer,
            response_timeout,
        })
    }

    /// Send one request line and wait for the single response line.
    ///
    /// Returns `None` if the server closed the connection.
    pub async fn send_request(&mut self, request: &Request) -> Result<Option<String>> {
        let line = request.to_line()?;
        self.writer
            .write_all(format!("{}\n", line).as_bytes())
            .await
            .context("Failed to send request to chat server")?;

        match timeout(self.response_timeout, self.reader.next_line()).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(e).context("Failed to read response from chat server"),
            Err(_) => Err(anyhow!(
                "no response from chat server within {:?}",
                self.response_timeout
            )),
        }
    }
}

/// Run the interactive menu loop until the user exits, stdin closes, or the
/// server disconnects
pub async fn run_interactive(mut session: ClientSession) -> Result<()> {
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    println!("Conectado al servidor de chat.");

    loop {
        println!("{}", MENU);

        let choice = match prompt_line(&mut input, "Seleccione: ").await? {
            Some(choice) => choice,
            None => break,
        };

        let request = match MenuChoice::parse(&choice) {
            MenuChoice::AccountQuery => match prompt_parsed::<i64>(&mut input, "Cuenta: ").await? {
                Some(account) => Request::account_query(account),
                None => break,
            },
            MenuChoice::Transfer => {
                let from = match prompt_parsed::<i64>(&mut input, "Cuenta origen: ").await? {
                    Some(from) => from,
                    None => break,
                };
                let to = match prompt_parsed::<i64>(&mut input, "Cuenta destino: ").await? {
                    Some(to) => to,
                    None => break,
                };
                let amount = match prompt_parsed::<f64>(&mut input, "Monto: ").await? {
                    Some(amount) => amount,
                    None => break,
                };
                Request::transfer(from, to, amount)
            }
            MenuChoice::Exit => break,
        };

        match session.send_request(&request).await? {
            Some(response) => println!("[Respuesta]: {}", response),
            None => {
                println!("El servidor cerró la conexión.");
                break;
            }
        }
    }

    Ok(())
}

/// Print a prompt and read one line from stdin
async fn prompt_line(input: &mut StdinLines, prompt: &str) -> Result<Option<String>> {
    print!("{}", prompt);
    std::io::stdout().flush().context("Failed to flush stdout")?;
    Ok(input.next_line().await?)
}

/// Prompt until the input parses, re-asking on invalid values.
///
/// Returns `None` only when stdin is closed.
async fn prompt_parsed<T: FromStr>(input: &mut StdinLines, prompt: &str) -> Result<Option<T>> {
    loop {
        match prompt_line(input, prompt).await? {
            Some(text) => match text.trim().parse::<T>() {
                Ok(value) => return Ok(Some(value)),
                Err(_) => println!("Valor inválido, intente de nuevo."),
            },
            None => return Ok(None),
        }
    }
}

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;

use crate::keys::KeySet;
use crate::Result;

/// Perform a key exchange with a remote clevis client, with the usual roles
/// inverted: the key holder dials out to the client waiting to be unlocked.
///
/// The wire format is line oriented. The initiator sends its default
/// advertisement, the responder answers with a thumbprint line and a blinded
/// client JWK line, and the initiator closes out with the recovered JWK.
pub async fn reverse_handshake(address: &str, keys: &KeySet) -> Result<()> {
    log::debug!("dialing remote client at '{address}'");
    let stream = TcpStream::connect(address).await?;
    let (read_half, mut write_half) = stream.into_split();

    write_half.write_all(keys.default_advertisement()).await?;
    write_half.write_all(b"\n").await?;

    let mut reader = BufReader::new(read_half);
    let thp = read_trimmed_line(&mut reader).await?;
    let client_key = read_trimmed_line(&mut reader).await?;

    let out = keys.recover(&thp, client_key.as_bytes())?;

    write_half.write_all(&out).await?;
    write_half.write_all(b"\n").await?;
    Ok(())
}

async fn read_trimmed_line(reader: &mut BufReader<OwnedReadHalf>) -> Result<String> {
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }
    Ok(line.trim_end().to_owned())
}

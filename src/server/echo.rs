//! Echo application driven through the application view of a pipeline.

use tokio::io::AsyncWriteExt;

use crate::duplex::DuplexHalf;

/// Copy every inbound byte back out until the peer stops sending.
///
/// Completes the outbound side once the inbound side ends. Returns the number
/// of bytes echoed.
pub async fn run_echo(app: DuplexHalf) -> std::io::Result<u64> {
    let (mut inbound, mut outbound) = tokio::io::split(app);
    let echoed = tokio::io::copy(&mut inbound, &mut outbound).await?;
    outbound.shutdown().await?;
    Ok(echoed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplex::{DuplexPipe, PipeOptions};

    #[tokio::test]
    async fn echoes_until_input_completes() {
        let mut pipe = DuplexPipe::new(&PipeOptions::default());
        let app = pipe.application().unwrap();
        let (mut output, mut input) = pipe.adapter().unwrap().into_parts();

        let task = tokio::spawn(run_echo(app));

        input.write(b"ping ").unwrap();
        input.write(b"pong").unwrap();
        input.flush().await.unwrap();
        input.complete(None);

        let mut echoed = Vec::new();
        loop {
            let result = output.read().await.unwrap();
            echoed.extend_from_slice(&result.buffer.to_vec());
            let len = result.buffer.len();
            output.advance(len);
            if result.is_completed {
                assert!(result.error.is_none());
                break;
            }
        }

        assert_eq!(echoed, b"ping pong");
        assert_eq!(task.await.unwrap().unwrap(), 9);
    }
}

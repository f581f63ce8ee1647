//! Join command: attach the local terminal to a server's screen session

use std::io::{stdout, Write};

use anyhow::{bail, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, size, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use tokio::sync::mpsc;

use afl_core::traits::InteractiveSession;
use afl_orchestrator::JoinOutcome;

use crate::app::App;
use crate::output::{print_info, print_success};

/// Attach to a server's screen session until Ctrl+] or the session ends
pub async fn join_command(app: &App, server: &str) -> Result<()> {
    let orchestrator = app.orchestrator()?;

    let session = match orchestrator.join_server(server).await {
        JoinOutcome::Attached(session) => session,
        JoinOutcome::SshDown => bail!("{}: SSH DOWN", server),
        JoinOutcome::Failed { error } => bail!("{}: {}", server, error),
    };

    print_info(&format!("Attached to '{}' (Press Ctrl+] to detach)", server));
    run_terminal(session).await?;
    print_success(&format!("Detached from '{}'", server));
    Ok(())
}

/// Restores the terminal however the session loop ends
struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = stdout().execute(LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

async fn run_terminal(session: InteractiveSession) -> Result<()> {
    let (writer, mut output) = session.split();
    let _guard = RawModeGuard::enter()?;
    let mut stdout = stdout();

    if let Ok((cols, rows)) = size() {
        writer.resize(cols.into(), rows.into()).await?;
    }

    // Terminal events are read on a blocking thread
    let (event_tx, mut event_rx) = mpsc::channel::<Event>(256);
    let event_handle = tokio::task::spawn_blocking(move || loop {
        if event::poll(std::time::Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(evt) = event::read() {
                if event_tx.blocking_send(evt).is_err() {
                    break;
                }
            }
        } else if event_tx.is_closed() {
            break;
        }
    });

    loop {
        tokio::select! {
            Some(evt) = event_rx.recv() => match evt {
                Event::Key(KeyEvent { code, modifiers, kind, .. }) => {
                    if kind == KeyEventKind::Release {
                        continue;
                    }
                    // Ctrl+] detaches
                    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char(']') {
                        break;
                    }

                    let data = key_to_bytes(code, modifiers);
                    if !data.is_empty() && writer.write(data).await.is_err() {
                        break;
                    }
                }
                Event::Paste(text) => {
                    if writer.write(text.into_bytes()).await.is_err() {
                        break;
                    }
                }
                Event::Resize(cols, rows) => {
                    if let Err(e) = writer.resize(cols.into(), rows.into()).await {
                        tracing::debug!("Resize not delivered: {}", e);
                    }
                }
                _ => {}
            },

            chunk = output.recv() => match chunk {
                Some(bytes) => {
                    stdout.write_all(&bytes)?;
                    stdout.flush()?;
                }
                // Remote side closed
                None => break,
            },
        }
    }

    drop(event_rx);
    let _ = event_handle.await;
    Ok(())
}

/// Bytes a VT100-style terminal sends for a key press.
///
/// Keys with no terminal encoding yield an empty vector.
pub fn key_to_bytes(code: KeyCode, modifiers: KeyModifiers) -> Vec<u8> {
    match code {
        KeyCode::Char(c) if modifiers.contains(KeyModifiers::CONTROL) => match control_byte(c) {
            Some(byte) => vec![byte],
            None => encode_char(c),
        },
        KeyCode::Char(c) if modifiers.contains(KeyModifiers::ALT) => {
            let mut bytes = vec![ESC];
            bytes.extend(encode_char(c));
            bytes
        }
        KeyCode::Char(c) => encode_char(c),
        KeyCode::Enter => vec![b'\r'],
        KeyCode::Tab => vec![b'\t'],
        KeyCode::Backspace => vec![0x7f],
        KeyCode::Esc => vec![ESC],
        KeyCode::BackTab => csi("Z"),
        KeyCode::Up => csi("A"),
        KeyCode::Down => csi("B"),
        KeyCode::Right => csi("C"),
        KeyCode::Left => csi("D"),
        KeyCode::Home => csi("H"),
        KeyCode::End => csi("F"),
        KeyCode::Insert => csi("2~"),
        KeyCode::Delete => csi("3~"),
        KeyCode::PageUp => csi("5~"),
        KeyCode::PageDown => csi("6~"),
        KeyCode::F(n @ 1..=4) => vec![ESC, b'O', b'P' + (n - 1)],
        KeyCode::F(n) => match FUNCTION_KEY_CODES.get(usize::from(n).wrapping_sub(5)) {
            Some(code) => csi(&format!("{}~", code)),
            None => Vec::new(),
        },
        _ => Vec::new(),
    }
}

const ESC: u8 = 0x1b;

/// `CSI <code> ~` parameters for F5 to F12
const FUNCTION_KEY_CODES: [u8; 8] = [15, 17, 18, 19, 20, 21, 23, 24];

fn csi(tail: &str) -> Vec<u8> {
    let mut bytes = vec![ESC, b'['];
    bytes.extend_from_slice(tail.as_bytes());
    bytes
}

fn encode_char(c: char) -> Vec<u8> {
    let mut buf = [0u8; 4];
    c.encode_utf8(&mut buf).as_bytes().to_vec()
}

/// C0 control code for Ctrl+`c`, if the terminal has one
fn control_byte(c: char) -> Option<u8> {
    match c {
        'a'..='z' | 'A'..='Z' => Some(c.to_ascii_uppercase() as u8 - b'@'),
        '@' | ' ' | '2' => Some(0x00),
        '[' | '3' => Some(0x1b),
        '\\' | '4' => Some(0x1c),
        ']' | '5' => Some(0x1d),
        '^' | '~' | '6' => Some(0x1e),
        '_' | '/' | '7' => Some(0x1f),
        '?' | '8' => Some(0x7f),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_letters() {
        // Ctrl+A is screen's command prefix
        assert_eq!(key_to_bytes(KeyCode::Char('a'), KeyModifiers::CONTROL), vec![0x01]);
        assert_eq!(key_to_bytes(KeyCode::Char('C'), KeyModifiers::CONTROL), vec![0x03]);
        assert_eq!(key_to_bytes(KeyCode::Char('z'), KeyModifiers::CONTROL), vec![0x1a]);
    }

    #[test]
    fn test_control_punctuation_maps_to_c0_codes() {
        let ctrl = |c| key_to_bytes(KeyCode::Char(c), KeyModifiers::CONTROL);

        assert_eq!(ctrl('@'), vec![0x00]);
        assert_eq!(ctrl(' '), vec![0x00]);
        assert_eq!(ctrl('['), vec![0x1b]);
        assert_eq!(ctrl('\\'), vec![0x1c]);
        assert_eq!(ctrl(']'), vec![0x1d]);
        assert_eq!(ctrl('^'), vec![0x1e]);
        assert_eq!(ctrl('_'), vec![0x1f]);
        assert_eq!(ctrl('?'), vec![0x7f]);
    }

    #[test]
    fn test_control_without_c0_code_sends_the_char() {
        assert_eq!(key_to_bytes(KeyCode::Char('1'), KeyModifiers::CONTROL), b"1".to_vec());
        assert_eq!(key_to_bytes(KeyCode::Char('é'), KeyModifiers::CONTROL), "é".as_bytes());
    }

    #[test]
    fn test_alt_prefixes_escape() {
        assert_eq!(key_to_bytes(KeyCode::Char('x'), KeyModifiers::ALT), vec![0x1b, b'x']);
    }

    #[test]
    fn test_plain_and_special_keys() {
        assert_eq!(key_to_bytes(KeyCode::Char('é'), KeyModifiers::NONE), "é".as_bytes());
        assert_eq!(key_to_bytes(KeyCode::Enter, KeyModifiers::NONE), vec![b'\r']);
        assert_eq!(key_to_bytes(KeyCode::Up, KeyModifiers::NONE), b"\x1b[A".to_vec());
        assert_eq!(key_to_bytes(KeyCode::Delete, KeyModifiers::NONE), b"\x1b[3~".to_vec());
        assert_eq!(key_to_bytes(KeyCode::F(13), KeyModifiers::NONE), Vec::<u8>::new());
    }

    #[test]
    fn test_function_keys() {
        assert_eq!(key_to_bytes(KeyCode::F(1), KeyModifiers::NONE), b"\x1bOP".to_vec());
        assert_eq!(key_to_bytes(KeyCode::F(4), KeyModifiers::NONE), b"\x1bOS".to_vec());
        assert_eq!(key_to_bytes(KeyCode::F(5), KeyModifiers::NONE), b"\x1b[15~".to_vec());
        assert_eq!(key_to_bytes(KeyCode::F(11), KeyModifiers::NONE), b"\x1b[23~".to_vec());
        assert_eq!(key_to_bytes(KeyCode::F(12), KeyModifiers::NONE), b"\x1b[24~".to_vec());
        assert_eq!(key_to_bytes(KeyCode::F(0), KeyModifiers::NONE), Vec::<u8>::new());
    }
}

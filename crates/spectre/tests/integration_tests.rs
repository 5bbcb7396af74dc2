use anyhow::Result;
use serde_json::{json, Value};
use std::{
    io::{Read, Write},
    net::{TcpListener, TcpStream},
    process::{ChildStdin, ChildStdout, Command, Stdio},
};

// Note if you get an empty response with no error, that typically means
// the server died
fn read_message(stdout: &mut ChildStdout) -> Result<String> {
    let mut content_length = None;
    let mut buf = vec![];
    loop {
        let mut buf2 = vec![0];
        stdout.read_exact(&mut buf2)?;
        buf.push(buf2[0]);
        if let Some(content_length) = content_length {
            if buf.len() == content_length {
                break;
            }
        } else {
            let len = buf.len();
            if len > 4
                && buf[len - 4] == 13
                && buf[len - 3] == 10
                && buf[len - 2] == 13
                && buf[len - 1] == 10
            {
                content_length =
                    Some(String::from_utf8(buf[16..len - 4].to_vec())?.parse::<usize>()?);
                buf = vec![];
            }
        }
    }
    Ok(String::from_utf8(buf)?)
}

fn send_message(stdin: &mut ChildStdin, message: &str) -> Result<()> {
    stdin.write_all(format!("Content-Length: {}\r\n", message.as_bytes().len(),).as_bytes())?;
    stdin.write_all("\r\n".as_bytes())?;
    stdin.write_all(message.as_bytes())?;
    Ok(())
}

// The server emits progress notifications and its own requests while an ask
// is in flight; skip until the response for `id` shows up
fn read_response_for_id(stdout: &mut ChildStdout, id: i64) -> Result<Value> {
    loop {
        let message: Value = serde_json::from_str(&read_message(stdout)?)?;
        if message.get("id") == Some(&Value::from(id))
            && (message.get("result").is_some() || message.get("error").is_some())
        {
            return Ok(message);
        }
    }
}

fn read_http_request(stream: &mut TcpStream) -> String {
    let mut buf = vec![];
    let mut byte = [0u8; 1];
    loop {
        stream.read_exact(&mut byte).unwrap();
        buf.push(byte[0]);
        let len = buf.len();
        if len >= 4 && &buf[len - 4..] == b"\r\n\r\n" {
            break;
        }
    }
    let headers = String::from_utf8_lossy(&buf).to_string();
    let content_length = headers
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; content_length];
    stream.read_exact(&mut body).unwrap();
    String::from_utf8(body).unwrap()
}

// Stand-in for the Engram backend: answers one chat request
fn spawn_stub_server(body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let _request_body = read_http_request(&mut stream);
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).unwrap();
    });
    format!("http://{addr}/api/spectre/chat")
}

// Drives the compiled server over stdio the way an editor shim would:
// initialize against a stub backend, open a document, then
// - ask with an instruction: the answer document comes back in the result
// - ask without an instruction (dismissed prompt): empty result, no error
// - ask against a document that was never opened: an error response
#[test]
fn test_ask_sequence() -> Result<()> {
    let endpoint = spawn_stub_server(r#"{"response":"This function adds two numbers."}"#);

    let mut child = Command::new("cargo")
        .arg("run")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let mut stdin = child.stdin.take().unwrap();
    let mut stdout = child.stdout.take().unwrap();

    let initialization_message = json!({
        "jsonrpc": "2.0",
        "method": "initialize",
        "params": {
            "capabilities": {
                "window": {"workDoneProgress": true}
            },
            "clientInfo": {"name": "helix", "version": "24.3 (beb5afcb)"},
            "initializationOptions": {
                "spectre": {"chat_endpoint": endpoint}
            },
            "processId": 66009,
            "rootUri": null,
            "workspaceFolders": []
        },
        "id": 0
    })
    .to_string();
    send_message(&mut stdin, &initialization_message)?;
    let _ = read_message(&mut stdout)?;

    send_message(
        &mut stdin,
        r#"{"jsonrpc":"2.0","method":"initialized","params":{}}"#,
    )?;
    send_message(
        &mut stdin,
        r##"{"jsonrpc":"2.0","method":"textDocument/didOpen","params":{"textDocument":{"languageId":"rust","text":"fn add(a,b) { return a+b }\n","uri":"file:///fake.rs","version":0}}}"##,
    )?;
    send_message(
        &mut stdin,
        r##"{"jsonrpc":"2.0","method":"textDocument/ask","params":{"textDocument":{"uri":"file:///fake.rs"},"range":{"start":{"line":0,"character":0},"end":{"line":0,"character":26}},"instruction":"Explain this"},"id":1}"##,
    )?;

    let response = read_response_for_id(&mut stdout, 1)?;
    let content = response["result"]["content"]
        .as_str()
        .expect("ask result should carry the answer document");
    assert!(content.starts_with("// Spectre ANSWER:\n\n"));
    assert!(content.ends_with("This function adds two numbers."));

    // A dismissed instruction prompt is a silent no-op
    send_message(
        &mut stdin,
        r##"{"jsonrpc":"2.0","method":"textDocument/ask","params":{"textDocument":{"uri":"file:///fake.rs"},"range":{"start":{"line":0,"character":0},"end":{"line":0,"character":26}}},"id":2}"##,
    )?;
    let response = read_response_for_id(&mut stdout, 2)?;
    assert!(response["result"]["content"].is_null());
    assert!(response.get("error").is_none());

    // Asking against a document the server never saw fails without a network call
    send_message(
        &mut stdin,
        r##"{"jsonrpc":"2.0","method":"textDocument/ask","params":{"textDocument":{"uri":"file:///never-opened.rs"},"range":{"start":{"line":0,"character":0},"end":{"line":0,"character":1}},"instruction":"Explain this"},"id":3}"##,
    )?;
    let response = read_response_for_id(&mut stdout, 3)?;
    assert_eq!(
        response["error"]["message"],
        "No active editor found! Spectre cannot see."
    );

    child.kill()?;
    Ok(())
}

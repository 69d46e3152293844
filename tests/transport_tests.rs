//! Integration coverage for the NPC framed transport: ping/pong over many concurrent
//! connections, a server-side read timeout closing an idle connection, and a client
//! disconnecting before its response is delivered tripping `CloseNotify`.

use std::net::TcpListener;
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use mcpackv2::npc::{Client, Request, ResponseWriter, Server};

fn bind_loopback() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    (listener, addr)
}

fn ping_handler(w: &mut ResponseWriter, req: &Request) {
    let n: i32 = mcpackv2::unmarshal(&req.body).unwrap_or(0);
    let reply = mcpackv2::marshal(&(n + 1)).unwrap();
    let _ = w.write(&reply);
}

#[test]
fn ping_pong_round_trips_across_many_connections_and_requests() {
    let (listener, addr) = bind_loopback();
    let server = Server::new(ping_handler as fn(&mut ResponseWriter, &Request));
    thread::spawn(move || server.serve(listener).unwrap());

    let client = Arc::new(
        Client::new(&[addr.as_str()])
            .unwrap()
            .with_timeout(Duration::from_secs(2)),
    );

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let client = client.clone();
            thread::spawn(move || {
                for i in 0..10 {
                    let body = mcpackv2::marshal(&i).unwrap();
                    let resp = client.do_request(body).unwrap();
                    let got: i32 = mcpackv2::unmarshal(&resp.body).unwrap();
                    assert_eq!(got, i + 1);
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
}

fn noop_handler(_w: &mut ResponseWriter, _req: &Request) {}

#[test]
fn server_read_timeout_closes_an_idle_connection() {
    let (listener, addr) = bind_loopback();
    let server = Server::new(noop_handler as fn(&mut ResponseWriter, &Request))
        .with_read_timeout(Duration::from_millis(100));
    thread::spawn(move || server.serve(listener).unwrap());

    let mut stream = TcpStream::connect(&addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_millis(1500))).unwrap();

    // Never send a request; the server's read deadline should expire and it should drop the
    // connection, which this end observes as EOF.
    let mut buf = [0u8; 1];
    let n = std::io::Read::read(&mut stream, &mut buf).unwrap();
    assert_eq!(n, 0);
}

#[test]
fn close_notify_fires_once_the_client_disconnects_before_reading_the_response() {
    let (listener, addr) = bind_loopback();
    let (tx, rx) = std::sync::mpsc::sync_channel::<bool>(1);

    let handler = move |w: &mut ResponseWriter, _req: &Request| {
        let notify = w.close_notify().unwrap();
        let mut closed = false;
        for _ in 0..40 {
            if notify.is_closed() {
                closed = true;
                break;
            }
            thread::sleep(Duration::from_millis(25));
        }
        let _ = tx.send(closed);
        // A peer that's gone won't read this, but the writer contract still requires a
        // non-empty body to actually hit the wire at all.
        let _ = w.write(b"done");
    };
    let server = Server::new(handler);
    thread::spawn(move || server.serve(listener).unwrap());

    {
        let mut stream = TcpStream::connect(&addr).unwrap();
        let req = Request::new(b"hello".to_vec());
        req.write_to(&mut stream).unwrap();
        // Dropping `stream` here closes both halves before any response is read.
    }

    let closed = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert!(closed, "server never observed the client disconnecting");
}

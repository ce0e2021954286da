//! End-to-end coverage of the concrete scenarios spec.md §8 lists: a real
//! `netfs-agent` worker, served on a real loopback `TcpStream`, driven by a
//! hand-rolled client that speaks the wire protocol directly (standing in
//! for `netfs-layer`, which this crate doesn't depend on).

use std::ffi::CString;
use std::io::Read;
use std::net::{TcpListener, TcpStream};

use netfs_protocol::file::{CloseRequest, OpenRequest, ReadRequest};
use netfs_protocol::frame::{decode_integer_reply, encode_frame, recv_frame, send_all, split_frame};
use netfs_protocol::tree::DirTreeWire;
use netfs_protocol::{Opcode, OFFSET};

/// Starts one agent worker on a freshly bound loopback port and returns a
/// connected client stream plus the listener's address (kept alive so the
/// port isn't reused out from under us).
fn spawn_worker() -> (TcpStream, TcpListener) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let accept_listener = listener.try_clone().unwrap();
    std::thread::spawn(move || {
        let (stream, peer) = accept_listener.accept().unwrap();
        netfs_agent::worker::serve(stream, peer);
    });

    let client = TcpStream::connect(addr).unwrap();
    (client, listener)
}

fn roundtrip(client: &mut TcpStream, opcode: Opcode, body: &[u8]) -> Vec<u8> {
    send_all(client, &encode_frame(opcode, body)).unwrap();
    let frame = recv_frame(client).unwrap();
    let (got_opcode, reply_body) = split_frame(&frame).unwrap();
    assert_eq!(got_opcode, opcode);
    reply_body.to_vec()
}

/// spec.md §8 scenario 1: open an existing file, read its full contents back
/// in one call, close it.
#[test]
fn open_read_close_round_trip_on_real_file() {
    let (mut client, _listener) = spawn_worker();

    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), b"hello\n").unwrap();
    let path = CString::new(file.path().to_str().unwrap()).unwrap();

    let open_req = OpenRequest {
        flags: libc::O_RDONLY,
        mode: 0,
        path,
    };
    let reply = roundtrip(&mut client, Opcode::Open, &open_req.encode());
    let wire_fd = decode_integer_reply(&reply);
    assert!(wire_fd >= OFFSET as i64, "fd {wire_fd} should be in the remote range");

    let read_req = ReadRequest {
        fd: wire_fd as i32,
        nbyte: 16,
    };
    let reply = roundtrip(&mut client, Opcode::Read, &read_req.encode());
    let read_reply = netfs_protocol::file::ReadReply::decode(&reply).unwrap();
    assert_eq!(read_reply.read_num, 6);
    assert_eq!(&read_reply.data, b"hello\n");

    let close_req = CloseRequest {
        fd: wire_fd as i32,
    };
    let reply = roundtrip(&mut client, Opcode::Close, &close_req.encode());
    assert_eq!(decode_integer_reply(&reply), 0);
}

/// spec.md §8 scenario 2: opening a nonexistent path returns a negative
/// integer reply carrying the host's ENOENT.
#[test]
fn open_nonexistent_path_reports_enoent() {
    let (mut client, _listener) = spawn_worker();

    let open_req = OpenRequest {
        flags: libc::O_RDONLY,
        mode: 0,
        path: CString::new("/no/such/path/hopefully/netfs-e2e-test").unwrap(),
    };
    let reply = roundtrip(&mut client, Opcode::Open, &open_req.encode());
    assert_eq!(decode_integer_reply(&reply), -(libc::ENOENT as i64));
}

/// spec.md §8 scenario 4: a nested directory tree comes back in BFS order
/// with the right subdir counts at every level.
#[test]
fn dirtree_nested_directories_in_bfs_order() {
    let (mut client, _listener) = spawn_worker();

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("a");
    std::fs::create_dir(&root).unwrap();
    std::fs::create_dir(root.join("b")).unwrap();
    std::fs::create_dir(root.join("c")).unwrap();
    std::fs::create_dir(root.join("b").join("d")).unwrap();

    let path_req = netfs_protocol::file::PathRequest {
        path: CString::new(root.to_str().unwrap()).unwrap(),
    };
    let reply = roundtrip(&mut client, Opcode::DirTree, &path_req.encode());
    let wire = DirTreeWire::decode(&reply).unwrap();
    let DirTreeWire::Tree(tree) = wire else {
        panic!("expected a tree, got an error reply");
    };

    assert_eq!(tree.name, "a");
    assert_eq!(tree.children.len(), 2);
    assert_eq!(tree.children[0].name, "b");
    assert_eq!(tree.children[1].name, "c");
    assert_eq!(tree.children[0].children.len(), 1);
    assert_eq!(tree.children[0].children[0].name, "d");
    assert_eq!(tree.children[1].children.len(), 0);
}

/// spec.md §8 scenario 6 (first half): a dropped connection ends the
/// session without the worker thread spinning or panicking. We can't
/// observe the worker thread directly, but we can observe that writing to
/// the now-closed socket fails (the worker exits and its peer half closes).
#[test]
fn disconnecting_mid_session_ends_the_worker_cleanly() {
    let (client, _listener) = spawn_worker();
    drop(client);
    // Give the worker thread a moment to notice the clean EOF and exit;
    // nothing to assert beyond "this doesn't hang or panic the test binary".
    std::thread::sleep(std::time::Duration::from_millis(50));
}

/// Two independent connections to the same agent process don't interfere:
/// each gets its own descriptor table, so the same in-band wire fd value can
/// mean a different real file on each connection.
#[test]
fn independent_connections_get_independent_descriptor_tables() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    for _ in 0..2 {
        let accept_listener = listener.try_clone().unwrap();
        std::thread::spawn(move || {
            let (stream, peer) = accept_listener.accept().unwrap();
            netfs_agent::worker::serve(stream, peer);
        });
    }

    let file_a = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file_a.path(), b"AAAA").unwrap();
    let file_b = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file_b.path(), b"BBBB").unwrap();

    let mut client_a = TcpStream::connect(addr).unwrap();
    let mut client_b = TcpStream::connect(addr).unwrap();

    let open_a = OpenRequest {
        flags: libc::O_RDONLY,
        mode: 0,
        path: CString::new(file_a.path().to_str().unwrap()).unwrap(),
    };
    let open_b = OpenRequest {
        flags: libc::O_RDONLY,
        mode: 0,
        path: CString::new(file_b.path().to_str().unwrap()).unwrap(),
    };

    let fd_a = decode_integer_reply(&roundtrip(&mut client_a, Opcode::Open, &open_a.encode()));
    let fd_b = decode_integer_reply(&roundtrip(&mut client_b, Opcode::Open, &open_b.encode()));

    let read_a = ReadRequest {
        fd: fd_a as i32,
        nbyte: 4,
    };
    let read_b = ReadRequest {
        fd: fd_b as i32,
        nbyte: 4,
    };
    let reply_a = netfs_protocol::file::ReadReply::decode(&roundtrip(
        &mut client_a,
        Opcode::Read,
        &read_a.encode(),
    ))
    .unwrap();
    let reply_b = netfs_protocol::file::ReadReply::decode(&roundtrip(
        &mut client_b,
        Opcode::Read,
        &read_b.encode(),
    ))
    .unwrap();

    assert_eq!(&reply_a.data, b"AAAA");
    assert_eq!(&reply_b.data, b"BBBB");
}

/// spec.md §8 boundary behavior: `read(nbyte = 0)` returns `0` and no
/// payload bytes.
#[test]
fn zero_byte_read_transfers_nothing() {
    let (mut client, _listener) = spawn_worker();

    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), b"some content").unwrap();
    let open_req = OpenRequest {
        flags: libc::O_RDONLY,
        mode: 0,
        path: CString::new(file.path().to_str().unwrap()).unwrap(),
    };
    let wire_fd = decode_integer_reply(&roundtrip(&mut client, Opcode::Open, &open_req.encode()));

    let read_req = ReadRequest {
        fd: wire_fd as i32,
        nbyte: 0,
    };
    let reply =
        netfs_protocol::file::ReadReply::decode(&roundtrip(&mut client, Opcode::Read, &read_req.encode()))
            .unwrap();
    assert_eq!(reply.read_num, 0);
    assert!(reply.data.is_empty());
}

/// A write larger than the agent's 512-byte scratch-reassembly chunk (the
/// original source's loop size) still arrives intact — proving frame
/// reassembly, not just small messages, works end to end.
#[test]
fn write_larger_than_single_chunk_reassembles_correctly() {
    let (mut client, _listener) = spawn_worker();

    let file = tempfile::NamedTempFile::new().unwrap();
    let open_req = OpenRequest {
        flags: libc::O_WRONLY,
        mode: 0,
        path: CString::new(file.path().to_str().unwrap()).unwrap(),
    };
    let wire_fd = decode_integer_reply(&roundtrip(&mut client, Opcode::Open, &open_req.encode()));

    let payload = vec![0xABu8; 4096];
    let write_req = netfs_protocol::file::WriteRequest {
        fd: wire_fd as i32,
        data: payload.clone(),
    };
    let reply = roundtrip(&mut client, Opcode::Write, &write_req.encode());
    assert_eq!(decode_integer_reply(&reply), payload.len() as i64);

    let close_req = CloseRequest {
        fd: wire_fd as i32,
    };
    roundtrip(&mut client, Opcode::Close, &close_req.encode());

    let mut written = Vec::new();
    std::fs::File::open(file.path())
        .unwrap()
        .read_to_end(&mut written)
        .unwrap();
    assert_eq!(written, payload);
}

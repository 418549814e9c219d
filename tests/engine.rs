//! End-to-end exercises of [`Engine`] against real OS pipes.

#![cfg(unix)]

use std::cell::{Cell, RefCell};
use std::fs::File;
use std::io::Write;
use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};
use std::rc::Rc;

use evio::Engine;

fn pipe() -> (File, File) {
    let mut fds: [RawFd; 2] = [0, 0];
    let result = unsafe { libc::pipe(fds.as_mut_ptr()) };
    assert_eq!(result, 0, "pipe(2) failed: {}", std::io::Error::last_os_error());
    unsafe { (File::from_raw_fd(fds[0]), File::from_raw_fd(fds[1])) }
}

#[test]
fn read_delivers_bytes_written_after_submit() {
    let (reader, mut writer) = pipe();
    let mut engine = Engine::new();

    let received = Rc::new(RefCell::new(Vec::new()));
    let seen = received.clone();

    engine
        .async_read(reader.as_raw_fd(), 64, move |event| {
            seen.borrow_mut().extend_from_slice(event.buffer);
            event.buffer.len()
        })
        .unwrap();

    writer.write_all(b"hello").unwrap();
    engine.wait(200).unwrap();

    assert_eq!(&*received.borrow(), b"hello");
}

#[test]
fn unconsumed_input_bytes_persist_until_more_data_arrives() {
    // Leaving bytes unconsumed keeps the operation as head without
    // retiring it; those bytes stay at the front of the buffer and the
    // next `read` appends new data behind them, rather than the engine
    // re-presenting the same leftover bytes on its own.
    let (reader, mut writer) = pipe();
    let mut engine = Engine::new();

    let calls: Rc<RefCell<Vec<Vec<u8>>>> = Rc::new(RefCell::new(Vec::new()));
    let seen = calls.clone();

    engine
        .async_read(reader.as_raw_fd(), 64, move |event| {
            seen.borrow_mut().push(event.buffer.to_vec());
            // Leave the last byte of whatever's available unconsumed.
            event.length.saturating_sub(1)
        })
        .unwrap();

    writer.write_all(b"ab").unwrap();
    engine.wait(100).unwrap();

    writer.write_all(b"c").unwrap();
    engine.wait(100).unwrap();

    let recorded = calls.borrow();
    assert_eq!(recorded.len(), 2);
    assert_eq!(recorded[0], b"ab");
    assert_eq!(recorded[1], b"bc");
}

#[test]
fn write_retires_once_every_byte_is_written() {
    let (mut reader, writer) = pipe();
    let mut engine = Engine::new();

    let done = Rc::new(Cell::new(false));
    let marker = done.clone();

    engine
        .async_write(writer.as_raw_fd(), b"payload", move |event| {
            if event.error.is_none() && event.count == event.size {
                marker.set(true);
            }
        })
        .unwrap();

    engine.wait(200).unwrap();
    assert!(done.get());

    let mut buffer = [0u8; 16];
    let n = std::io::Read::read(&mut reader, &mut buffer).unwrap();
    assert_eq!(&buffer[..n], b"payload");
}

#[test]
fn end_of_stream_is_reported_once_writer_is_dropped() {
    let (reader, writer) = pipe();
    drop(writer);

    let mut engine = Engine::new();
    let reached_end = Rc::new(Cell::new(false));
    let marker = reached_end.clone();

    engine
        .async_read(reader.as_raw_fd(), 32, move |event| {
            if event.end {
                marker.set(true);
            }
            event.length
        })
        .unwrap();

    engine.wait(200).unwrap();
    assert!(reached_end.get());
}

#[test]
fn alarm_fires_without_any_registered_descriptor() {
    let mut engine = Engine::new();
    let fired = Rc::new(Cell::new(false));
    let marker = fired.clone();

    engine.async_relative_alarm(0, move || marker.set(true));
    engine.wait(100).unwrap();

    assert!(fired.get());
}

#[test]
fn due_alarm_is_serviced_before_a_simultaneously_ready_descriptor() {
    let (reader, mut writer) = pipe();
    writer.write_all(b"x").unwrap();

    let mut engine = Engine::new();
    let order = Rc::new(RefCell::new(Vec::new()));

    let alarm_order = order.clone();
    engine.async_relative_alarm(0, move || alarm_order.borrow_mut().push("alarm"));

    let read_order = order.clone();
    engine
        .async_read(reader.as_raw_fd(), 8, move |event| {
            read_order.borrow_mut().push("read");
            event.length
        })
        .unwrap();

    engine.wait(200).unwrap();

    assert_eq!(order.borrow().first(), Some(&"alarm"));
}

#[test]
fn two_descriptors_are_serviced_in_round_robin_order() {
    let (reader_a, mut writer_a) = pipe();
    let (reader_b, mut writer_b) = pipe();
    writer_a.write_all(b"a").unwrap();
    writer_b.write_all(b"b").unwrap();

    let mut engine = Engine::new();
    let order = Rc::new(RefCell::new(Vec::new()));

    let order_a = order.clone();
    engine
        .async_read(reader_a.as_raw_fd(), 1, move |event| {
            order_a.borrow_mut().push('a');
            event.length
        })
        .unwrap();

    let order_b = order.clone();
    engine
        .async_read(reader_b.as_raw_fd(), 1, move |event| {
            order_b.borrow_mut().push('b');
            event.length
        })
        .unwrap();

    // Give both descriptors a chance to be dispatched at least once.
    for _ in 0..4 {
        engine.wait(50).unwrap();
    }

    assert!(order.borrow().contains(&'a'));
    assert!(order.borrow().contains(&'b'));
}

#[test]
fn cancelling_a_queued_but_not_yet_started_operation_prevents_its_callback() {
    let (reader, mut writer) = pipe();
    let mut engine = Engine::new();

    let first_ran = Rc::new(Cell::new(false));
    let marker = first_ran.clone();
    engine
        .async_read(reader.as_raw_fd(), 1, move |event| {
            marker.set(true);
            event.length
        })
        .unwrap();

    let second_ran = Rc::new(Cell::new(false));
    let marker = second_ran.clone();
    let second = engine
        .async_read(reader.as_raw_fd(), 1, move |event| {
            marker.set(true);
            event.length
        })
        .unwrap();

    assert!(engine.async_cancel(second));

    writer.write_all(b"z").unwrap();
    engine.wait(100).unwrap();

    assert!(first_ran.get());
    assert!(!second_ran.get());
}

#[test]
fn cancelling_the_head_operation_promotes_the_next_queued_one() {
    let (reader, mut writer) = pipe();
    let mut engine = Engine::new();

    let first_ran = Rc::new(Cell::new(false));
    let marker = first_ran.clone();
    let first = engine
        .async_read(reader.as_raw_fd(), 1, move |event| {
            marker.set(true);
            event.length
        })
        .unwrap();

    let second_ran = Rc::new(Cell::new(false));
    let marker = second_ran.clone();
    engine
        .async_read(reader.as_raw_fd(), 1, move |event| {
            marker.set(true);
            event.length
        })
        .unwrap();

    // `first` is still the head (nothing has driven the engine yet).
    assert!(engine.async_cancel(first));

    writer.write_all(b"z").unwrap();
    engine.wait(100).unwrap();

    assert!(!first_ran.get());
    assert!(second_ran.get());
}

#[test]
fn cancelling_a_pending_alarm_prevents_it_from_firing() {
    let mut engine = Engine::new();
    let fired = Rc::new(Cell::new(false));
    let marker = fired.clone();

    let handle = engine.async_relative_alarm(10_000, move || marker.set(true));
    assert!(engine.async_cancel(handle));

    engine.wait(50).unwrap();
    assert!(!fired.get());
}

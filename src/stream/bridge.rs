//! Splice→stream bridge.
//!
//! A plugin that only provides the one-shot splice shape cannot be paused
//! between windows, so streaming is synthesized with a worker thread: the
//! worker invokes the plugin's splice function exactly once over reader and
//! writer adapters that *yield* — post the current status on the result
//! channel and block on the request channel — whenever the current input
//! chunk is exhausted or the output window capacity is reached.  The caller
//! performs exactly one request/result exchange per `process`/`flush`/
//! `finish` call.
//!
//! Because the caller's windows are stack slices that cannot be shared with
//! the worker, each request carries an owned copy of the available input and
//! the output window's capacity, and each reply returns the bytes produced
//! plus how much of the chunk was consumed.  Unconsumed input is discarded
//! by the worker and resent by the caller on the next exchange.
//!
//! Dropping the stream mid-flight sends `Terminate`: the reader then reports
//! end-of-input, the writer fails, the plugin's splice unwinds without
//! further side effects, and the worker is joined.  A failure from the
//! worker is latched so later calls return it without touching the channels.

use std::cell::RefCell;
use std::io::{self, Read, Write};
use std::mem;
use std::rc::Rc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::codec::Codec;
use crate::options::Options;
use crate::status::{to_io_error, Error, Result, Status};
use crate::stream::{Direction, IoWindow, Operation};

struct Request {
    op: Operation,
    input: Vec<u8>,
    out_cap: usize,
}

struct Reply {
    result: Result<Status>,
    output: Vec<u8>,
    consumed: usize,
    finished: bool,
}

pub(crate) struct SpliceBridge {
    request_tx: Sender<Request>,
    reply_rx: Receiver<Reply>,
    worker: Option<JoinHandle<()>>,
    finished: bool,
    latched: Option<Error>,
}

impl SpliceBridge {
    pub(crate) fn spawn(
        codec: &'static Codec,
        direction: Direction,
        options: Option<Options>,
    ) -> Result<SpliceBridge> {
        let (request_tx, request_rx) = bounded::<Request>(1);
        let (reply_tx, reply_rx) = bounded::<Reply>(1);

        let worker = std::thread::Builder::new()
            .name(format!("crimp-splice-{}", codec.name()))
            .spawn(move || worker_main(codec, direction, options, request_rx, reply_tx))
            .map_err(|_| Error::Failed)?;

        Ok(SpliceBridge {
            request_tx,
            reply_rx,
            worker: Some(worker),
            finished: false,
            latched: None,
        })
    }

    /// One request/result exchange: hand the worker the current window,
    /// block until it yields or returns, and copy its output back.
    pub(crate) fn exchange(&mut self, op: Operation, io: &mut IoWindow<'_>) -> Result<Status> {
        if let Some(e) = self.latched {
            return Err(e);
        }
        if self.finished {
            return Err(Error::State);
        }

        self.request_tx
            .send(Request {
                op,
                input: io.input().to_vec(),
                out_cap: io.avail_out(),
            })
            .map_err(|_| Error::Failed)?;

        let reply = self.reply_rx.recv().map_err(|_| Error::Failed)?;

        io.consume(reply.consumed);
        let copied = io.write(&reply.output);
        debug_assert_eq!(copied, reply.output.len());

        if reply.finished {
            self.finished = true;
            self.join();
        }

        match reply.result {
            Ok(status) => Ok(status),
            Err(e) => {
                self.latched = Some(e);
                Err(e)
            }
        }
    }

    fn join(&mut self) {
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SpliceBridge {
    fn drop(&mut self) {
        if !self.finished && self.worker.is_some() {
            // Unwind the plugin: end-of-input on the reader, failure on the
            // writer.  No partial output is retained.
            let sent = self
                .request_tx
                .send(Request {
                    op: Operation::Terminate,
                    input: Vec::new(),
                    out_cap: 0,
                })
                .is_ok();
            if sent {
                let _ = self.reply_rx.recv();
            }
        }
        self.join();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Worker side
// ─────────────────────────────────────────────────────────────────────────────

struct WorkerIo {
    request_rx: Receiver<Request>,
    reply_tx: Sender<Reply>,
    op: Operation,
    input: Vec<u8>,
    in_pos: usize,
    out: Vec<u8>,
    out_cap: usize,
}

impl WorkerIo {
    fn avail_in(&self) -> usize {
        self.input.len() - self.in_pos
    }

    fn out_space(&self) -> usize {
        self.out_cap.saturating_sub(self.out.len())
    }

    /// Post `status` for the current request and block for the next one.
    fn yield_now(&mut self, status: Status) -> io::Result<Operation> {
        let reply = Reply {
            result: Ok(status),
            output: mem::take(&mut self.out),
            consumed: self.in_pos,
            finished: false,
        };
        self.reply_tx
            .send(reply)
            .map_err(|_| to_io_error(Error::Failed))?;

        let request = self
            .request_rx
            .recv()
            .map_err(|_| to_io_error(Error::Failed))?;
        self.op = request.op;
        self.input = request.input;
        self.in_pos = 0;
        self.out_cap = request.out_cap;
        Ok(self.op)
    }
}

/// Reader handed to the plugin's splice function.  Serves bytes from the
/// current input chunk, yielding to the caller when it runs dry; reports
/// end-of-input once the operation escalates to finish (or terminate).
struct BridgeReader(Rc<RefCell<WorkerIo>>);

impl Read for BridgeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut io = self.0.borrow_mut();
        let requested = buf.len();
        let mut remaining = requested;

        loop {
            let cp = io.avail_in().min(remaining);
            if cp != 0 {
                let start = requested - remaining;
                let from = io.in_pos;
                buf[start..start + cp].copy_from_slice(&io.input[from..from + cp]);
                io.in_pos += cp;
                remaining -= cp;
            }
            if remaining == 0 {
                break;
            }
            if matches!(io.op, Operation::Finish | Operation::Terminate) {
                break;
            }

            // Input exhausted mid-request: report whether this window's
            // input was fully consumed and wait to be driven again.
            let status = if io.avail_in() == 0 {
                Status::Ok
            } else {
                Status::Processing
            };
            io.yield_now(status)?;
        }

        Ok(requested - remaining)
    }
}

/// Writer handed to the plugin's splice function.  Accumulates into the
/// output allowance of the current window, yielding for a fresh window when
/// the allowance is used up.
struct BridgeWriter(Rc<RefCell<WorkerIo>>);

impl Write for BridgeWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        let mut io = self.0.borrow_mut();
        let requested = data.len();
        let mut remaining = requested;

        loop {
            let cp = io.out_space().min(remaining);
            if cp != 0 {
                let start = requested - remaining;
                io.out.extend_from_slice(&data[start..start + cp]);
                remaining -= cp;
            }
            if remaining == 0 {
                break;
            }
            if io.op == Operation::Terminate {
                break;
            }
            io.yield_now(Status::Processing)?;
        }

        let written = requested - remaining;
        if written != 0 {
            Ok(written)
        } else {
            // Terminating: fail the plugin's write so it unwinds.  Not
            // reported through the error channel — the stream may simply be
            // getting dropped before completion.
            Err(to_io_error(Error::Failed))
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn worker_main(
    codec: &'static Codec,
    direction: Direction,
    options: Option<Options>,
    request_rx: Receiver<Request>,
    reply_tx: Sender<Reply>,
) {
    // Wait for the first drive before touching the plugin.
    let first = match request_rx.recv() {
        Ok(r) => r,
        Err(_) => return,
    };
    let terminated_early = first.op == Operation::Terminate;

    let io = Rc::new(RefCell::new(WorkerIo {
        request_rx,
        reply_tx,
        op: first.op,
        input: first.input,
        in_pos: 0,
        out: Vec::new(),
        out_cap: first.out_cap,
    }));

    let result: Result<Status> = if terminated_early {
        Ok(Status::EndOfStream)
    } else {
        match codec.implementation().map(|imp| imp.splice) {
            Ok(Some(splice)) => {
                let mut reader = BridgeReader(Rc::clone(&io));
                let mut writer = BridgeWriter(Rc::clone(&io));
                match splice(codec, options.as_ref(), direction, &mut reader, &mut writer) {
                    // The plugin ran to completion; the stream is over.
                    Ok(()) => Ok(Status::EndOfStream),
                    Err(e) => Err(e),
                }
            }
            Ok(None) => Err(Error::UnableToLoad),
            Err(e) => Err(e),
        }
    };

    let mut io = io.borrow_mut();
    let reply = Reply {
        result,
        output: mem::take(&mut io.out),
        consumed: io.in_pos,
        finished: true,
    };
    let _ = io.reply_tx.send(reply);
}

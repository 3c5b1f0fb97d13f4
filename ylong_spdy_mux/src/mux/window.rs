// Copyright (c) 2023 Huawei Device Co., Ltd.
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! spdy send and recv window definition.

use ylong_spdy::frame::{StreamId, MAX_WINDOW_SIZE};
use ylong_spdy::{Frame, GoAwayStatus, SpdyError};

pub(crate) struct SendWindow {
    // As the sending window, only the size visible to this side is kept. It
    // shrinks when DATA is sent and grows on WINDOW_UPDATE. A SETTINGS change
    // of the initial window size may leave it below zero, in which case no
    // data can be sent until enough credit comes back.
    size: i64,
}

impl SendWindow {
    pub(crate) fn new(size: u32) -> Self {
        Self { size: size as i64 }
    }

    // The reported window never drops below zero, even while `size` does.
    pub(crate) fn size_available(&self) -> u32 {
        if self.size < 0 {
            0
        } else {
            self.size as u32
        }
    }

    pub(crate) fn increase_size(&mut self, size: u32) -> Result<(), SpdyError> {
        let curr = self.size + size as i64;
        if curr > MAX_WINDOW_SIZE as i64 {
            return Err(SpdyError::ConnectionError(GoAwayStatus::ProtocolError));
        }
        self.size = curr;
        Ok(())
    }

    pub(crate) fn apply_delta(&mut self, delta: i64) -> Result<(), SpdyError> {
        let curr = self.size + delta;
        if curr > MAX_WINDOW_SIZE as i64 {
            return Err(SpdyError::ConnectionError(GoAwayStatus::ProtocolError));
        }
        self.size = curr;
        Ok(())
    }

    // Callers size their frames with `size_available`, so a debit beyond it
    // means the accounting is broken.
    pub(crate) fn send_data(&mut self, size: u32) -> Result<(), SpdyError> {
        if size > self.size_available() {
            return Err(SpdyError::ConnectionError(GoAwayStatus::InternalError));
        }
        self.size -= size as i64;
        Ok(())
    }
}

pub(crate) struct RecvWindow {
    // The window size visible to the peer. Decreases when a DATA frame is
    // received and increases when a WINDOW_UPDATE is sent.
    available: i64,
    // Bytes already consumed by the application whose credit has not been
    // returned to the peer yet.
    unreleased: i64,
    // The size the window is replenished towards.
    ceiling: i64,
}

impl RecvWindow {
    pub(crate) fn new(size: u32) -> Self {
        Self {
            available: size as i64,
            unreleased: 0,
            ceiling: size as i64,
        }
    }

    pub(crate) fn available(&self) -> u32 {
        self.available as u32
    }

    pub(crate) fn unreleased(&self) -> u32 {
        self.unreleased as u32
    }

    // The peer sending beyond the window it was given is fatal.
    pub(crate) fn recv_data(&mut self, size: u32) -> Result<(), SpdyError> {
        if size as i64 > self.available {
            return Err(SpdyError::ConnectionError(GoAwayStatus::ProtocolError));
        }
        self.available -= size as i64;
        Ok(())
    }

    pub(crate) fn release(&mut self, size: u32) {
        self.unreleased += size as i64;
    }

    /// Returns `size` bytes of credit right away, bypassing the update policy.
    pub(crate) fn credit_back(&mut self, id: StreamId, size: u32) -> Option<Frame> {
        if size == 0 {
            return None;
        }
        self.available += size as i64;
        Some(Frame::window_update(id, size))
    }

    pub(crate) fn apply_delta(&mut self, delta: i64) {
        self.ceiling += delta;
    }

    pub(crate) fn grow_ceiling(&mut self, size: u32) -> Option<Frame> {
        let extra = size as i64 - self.ceiling;
        if extra <= 0 {
            return None;
        }
        self.ceiling = size as i64;
        self.credit_back(0, extra as u32)
    }

    pub(crate) fn check_window_update(&mut self, id: StreamId, ratio: u32) -> Option<Frame> {
        if self.unreleased <= 0 {
            return None;
        }
        // A settings change moves the ceiling without touching the credit the
        // peer holds, so the threshold follows whichever is smaller.
        let advertised = self.ceiling.min(self.available + self.unreleased);
        if self.unreleased * ratio as i64 >= advertised {
            let size = self.unreleased as u32;
            self.unreleased = 0;
            self.credit_back(id, size)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod ut_window {
    use ylong_spdy::{GoAwayStatus, Payload, SpdyError};

    use crate::mux::window::{RecvWindow, SendWindow};

    /// UT test cases for `SendWindow`.
    ///
    /// # Brief
    /// 1. Debits a send window, then overdraws it.
    /// 2. Credits it past the protocol maximum.
    /// 3. Checks if the results are correct.
    #[test]
    fn ut_send_window_debit_credit() {
        let mut window = SendWindow::new(100);
        assert!(window.send_data(60).is_ok());
        assert_eq!(window.size_available(), 40);
        assert_eq!(
            window.send_data(41),
            Err(SpdyError::ConnectionError(GoAwayStatus::InternalError))
        );
        assert_eq!(window.size_available(), 40);
        assert!(window.increase_size(60).is_ok());
        assert_eq!(window.size_available(), 100);
        assert!(window.increase_size(u32::MAX >> 1).is_err());
        assert_eq!(window.size_available(), 100);
    }

    /// UT test cases for `SendWindow::apply_delta`.
    ///
    /// # Brief
    /// 1. Shrinks a partially used window below zero.
    /// 2. Checks that no size is available until credit exceeds the deficit.
    #[test]
    fn ut_send_window_shrink() {
        let mut window = SendWindow::new(100);
        window.send_data(80).unwrap();
        window.apply_delta(-50).unwrap();
        assert_eq!(window.size_available(), 0);
        window.increase_size(20).unwrap();
        assert_eq!(window.size_available(), 0);
        assert!(window.send_data(1).is_err());
        window.increase_size(40).unwrap();
        assert_eq!(window.size_available(), 30);
    }

    /// UT test cases for `RecvWindow` accounting.
    ///
    /// # Brief
    /// 1. Receives data within and beyond the window.
    /// 2. Releases consumed bytes and checks the update threshold.
    #[test]
    fn ut_recv_window_update() {
        let mut window = RecvWindow::new(100);
        assert!(window.recv_data(30).is_ok());
        assert_eq!(window.available(), 70);
        assert!(window.recv_data(71).is_err());
        assert_eq!(window.available(), 70);

        window.release(30);
        assert!(window.check_window_update(1, 2).is_none());
        window.recv_data(30).unwrap();
        window.release(30);
        let frame = window.check_window_update(1, 2).unwrap();
        assert_eq!(frame.stream_id(), 1);
        match frame.payload() {
            Payload::WindowUpdate(update) => assert_eq!(update.get_delta(), 60),
            _ => panic!("unexpected payload"),
        }
        assert_eq!(window.available(), 100);
        assert_eq!(window.unreleased(), 0);
    }

    /// UT test cases for `RecvWindow::apply_delta`.
    ///
    /// # Brief
    /// 1. Raises the ceiling of a window above what was advertised.
    /// 2. Exhausts and releases the advertised window.
    /// 3. Checks that the credit is still returned.
    #[test]
    fn ut_recv_window_delta_replenish() {
        let mut window = RecvWindow::new(100);
        window.apply_delta(900);
        window.recv_data(100).unwrap();
        assert!(window.recv_data(1).is_err());
        window.release(100);
        let frame = window.check_window_update(1, 2).unwrap();
        match frame.payload() {
            Payload::WindowUpdate(update) => assert_eq!(update.get_delta(), 100),
            _ => panic!("unexpected payload"),
        }
        assert_eq!(window.available(), 100);
        assert_eq!(window.unreleased(), 0);
    }

    /// UT test cases for `RecvWindow::credit_back`.
    ///
    /// # Brief
    /// 1. Receives data, then credits it back immediately.
    /// 2. Checks that the window grows by exactly that amount.
    #[test]
    fn ut_recv_window_credit_back() {
        let mut window = RecvWindow::new(100);
        window.recv_data(40).unwrap();
        let before = window.available();
        let frame = window.credit_back(0, 40).unwrap();
        assert_eq!(frame.stream_id(), 0);
        assert_eq!(window.available(), before + 40);
        assert!(window.credit_back(0, 0).is_none());
    }

    /// UT test cases for `RecvWindow::grow_ceiling`.
    ///
    /// # Brief
    /// 1. Grows the ceiling of a window above its initial size.
    /// 2. Checks that the extra credit is announced once.
    #[test]
    fn ut_recv_window_grow_ceiling() {
        let mut window = RecvWindow::new(100);
        let frame = window.grow_ceiling(300).unwrap();
        match frame.payload() {
            Payload::WindowUpdate(update) => assert_eq!(update.get_delta(), 200),
            _ => panic!("unexpected payload"),
        }
        assert_eq!(window.available(), 300);
        assert!(window.grow_ceiling(300).is_none());
        assert!(window.grow_ceiling(50).is_none());
    }
}

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

//! Frame recv coroutine.

use tracing::{debug, warn};

use crate::dispatcher::{DispatchErrorKind, OutputMessage};
use crate::runtime::UnboundedSender;
use crate::transport::FrameRead;

pub(crate) struct RecvData<R> {
    reader: R,
    resp_tx: UnboundedSender<OutputMessage>,
}

impl<R: FrameRead> RecvData<R> {
    pub(crate) fn new(reader: R, resp_tx: UnboundedSender<OutputMessage>) -> Self {
        Self { reader, resp_tx }
    }

    /// Forwards frames to the manager until the transport ends or fails.
    pub(crate) async fn run(mut self) {
        loop {
            match self.reader.read_frame().await {
                Ok(Some(frame)) => {
                    if self.resp_tx.send(OutputMessage::Output(frame)).is_err() {
                        return;
                    }
                }
                Ok(None) => {
                    debug!("spdy transport reached EOF");
                    self.transmit_error(DispatchErrorKind::Disconnect);
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "spdy frame read failed");
                    self.transmit_error(e.into());
                    return;
                }
            }
        }
    }

    fn transmit_error(&self, err: DispatchErrorKind) {
        // The manager may already be gone.
        let _ = self.resp_tx.send(OutputMessage::OutputExit(err));
    }
}

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

//! defines `BodyDataRef`.

use std::task::{Context, Poll};

use bytes::Bytes;

use crate::body::Body;

pub(crate) enum BodyRead {
    Chunk(Bytes),
    // The body has no data ready yet.
    Blocked,
    End,
}

pub(crate) struct BodyDataRef {
    body: Option<Body>,
    // Part of a chunk that did not fit in the last frame.
    remainder: Option<Bytes>,
}

impl BodyDataRef {
    pub(crate) fn new(body: Body) -> Self {
        Self {
            body: Some(body),
            remainder: None,
        }
    }

    pub(crate) fn empty() -> Self {
        Self {
            body: None,
            remainder: None,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.body = None;
        self.remainder = None;
    }

    /// Whether every byte of the body has been read.
    pub(crate) fn is_end(&self) -> bool {
        self.remainder.is_none()
            && match self.body {
                None => true,
                Some(ref body) => body.is_end_stream(),
            }
    }

    /// Reads at most `max` bytes of the body.
    pub(crate) fn poll_read(&mut self, cx: &mut Context<'_>, max: usize) -> BodyRead {
        let mut chunk = match self.remainder.take() {
            Some(chunk) => chunk,
            None => loop {
                let body = match self.body.as_mut() {
                    None => return BodyRead::End,
                    Some(body) => body,
                };
                match body.poll_chunk(cx) {
                    Poll::Ready(Some(chunk)) if chunk.is_empty() => continue,
                    Poll::Ready(Some(chunk)) => break chunk,
                    Poll::Ready(None) => {
                        self.body = None;
                        return BodyRead::End;
                    }
                    Poll::Pending => return BodyRead::Blocked,
                }
            },
        };
        if chunk.len() > max {
            self.remainder = Some(chunk.split_off(max));
        }
        BodyRead::Chunk(chunk)
    }
}

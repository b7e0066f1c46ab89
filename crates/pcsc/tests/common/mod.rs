//! Common test utilities

use cardwatch_core::{ReaderHandle, ReaderTransport};
use cardwatch_transport_pcsc::PcscTransport;

/// Try to get a real PC/SC transport for tests
pub fn get_test_transport() -> Option<PcscTransport> {
    PcscTransport::new().ok()
}

/// Try to get a transport together with its first reader
pub fn get_transport_with_reader() -> Option<(PcscTransport, ReaderHandle)> {
    let transport = get_test_transport()?;
    let reader = transport.list_readers().ok()?.into_iter().next()?;
    Some((transport, reader))
}

mod cell;
mod cluster;
mod recoverings;
mod ring_buffer;

pub(crate) use cell::Cell;
pub(crate) use cluster::Cluster;
pub(crate) use recoverings::Recoverings;
pub(crate) use ring_buffer::RingBuffer;

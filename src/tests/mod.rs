//! End-to-end scenarios exercising the library the way the binary wires it.

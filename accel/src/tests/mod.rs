// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

mod mac;
